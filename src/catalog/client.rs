//! HTTP-backed [`CatalogClient`].

use super::http::{Endpoint, HttpClient, HttpResponse, Method};
use super::types::{CatalogArtifact, CertImage, CertificationInput, CertificationResults, ProjectRecord, RpmManifest, TestResults};
use super::{CatalogClient, CatalogConfig, CatalogError};
use crate::engine::context::RunContext;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Talks JSON to the catalog API, authenticated with an API key.
pub struct HttpCatalogClient {
    http: HttpClient,
    api_token: SecretString,
    project_id: String,
}

impl std::fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("endpoint", self.http.endpoint())
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        if config.project_id.is_empty() {
            return Err(CatalogError::MissingProjectId);
        }
        let endpoint = Endpoint::parse(&config.resolved_host())?;
        Ok(HttpCatalogClient {
            http: HttpClient::new(endpoint),
            api_token: config.api_token.clone(),
            project_id: config.project_id.clone(),
        })
    }

    fn project_path(&self) -> String {
        format!("/v1/projects/certification/id/{}", self.project_id)
    }

    fn call(
        &self,
        ctx: &RunContext,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, CatalogError> {
        if ctx.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        let headers = [("X-API-KEY", self.api_token.expose_secret())];
        self.http.send(method, path, &headers, body)
    }

    fn call_json<B, T>(
        &self,
        ctx: &RunContext,
        method: Method,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_string(body).map_err(CatalogError::Encode)?;
        let response = self.call(ctx, method, path, Some(&payload))?;
        decode(response, operation)
    }

    fn create_image(&self, ctx: &RunContext, image: &CertImage) -> Result<CertImage, CatalogError> {
        let payload = serde_json::to_string(image).map_err(CatalogError::Encode)?;
        let response = self.call(ctx, Method::Post, "/v1/images", Some(&payload))?;

        if response.status == 409 {
            debug!(digest = %image.docker_image_digest, "image already exists in catalog");
            return self
                .find_images_by_digest(ctx, &[image.docker_image_digest.clone()])?
                .into_iter()
                .next()
                .ok_or(CatalogError::Status {
                    status: 409,
                    operation: "create image",
                    body: "image exists but could not be found by digest".to_string(),
                });
        }
        decode(response, "create image")
    }

    fn create_rpm_manifest(&self, ctx: &RunContext, image_id: &str, manifest: &RpmManifest) -> Result<RpmManifest, CatalogError> {
        let mut manifest = manifest.clone();
        manifest.image_id = image_id.to_string();
        let path = format!("/v1/images/id/{}/rpm-manifest", image_id);
        let payload = serde_json::to_string(&manifest).map_err(CatalogError::Encode)?;
        let response = self.call(ctx, Method::Post, &path, Some(&payload))?;

        if response.status == 409 {
            debug!(image_id, "rpm manifest already exists in catalog");
            return Ok(manifest);
        }
        decode(response, "create rpm manifest")
    }
}

impl CatalogClient for HttpCatalogClient {
    fn get_project(&self, ctx: &RunContext) -> Result<Option<ProjectRecord>, CatalogError> {
        let response = self.call(ctx, Method::Get, &self.project_path(), None)?;
        if response.status == 404 || response.body.trim() == "null" {
            return Ok(None);
        }
        decode(response, "get project").map(Some)
    }

    fn submit_results(&self, ctx: &RunContext, input: &CertificationInput) -> Result<CertificationResults, CatalogError> {
        if !input.project.container.docker_config_json.is_empty() {
            let _: ProjectRecord = self.call_json(ctx, Method::Patch, &self.project_path(), &input.project, "update project")?;
        }

        let cert_image = self.create_image(ctx, &input.cert_image)?;
        info!(image_id = %cert_image.id, "image registered with catalog");

        let rpm_manifest = self.create_rpm_manifest(ctx, &cert_image.id, &input.rpm_manifest)?;

        let mut test_results = input.test_results.clone();
        test_results.cert_project = self.project_id.clone();
        test_results.image_id = cert_image.id.clone();
        let test_results: TestResults = self.call_json(
            ctx,
            Method::Post,
            &format!("{}/test-results", self.project_path()),
            &test_results,
            "create test results",
        )?;

        let mut artifacts = Vec::with_capacity(input.artifacts.len());
        for artifact in &input.artifacts {
            let mut artifact = artifact.clone();
            artifact.cert_project = self.project_id.clone();
            artifact.image_id = cert_image.id.clone();
            let created: CatalogArtifact = self.call_json(
                ctx,
                Method::Post,
                &format!("{}/artifacts", self.project_path()),
                &artifact,
                "create artifact",
            )?;
            artifacts.push(created);
        }

        Ok(CertificationResults {
            cert_image,
            test_results: Some(test_results),
            rpm_manifest: Some(rpm_manifest),
            artifacts,
        })
    }

    fn find_images_by_digest(&self, ctx: &RunContext, digests: &[String]) -> Result<Vec<CertImage>, CatalogError> {
        if digests.is_empty() {
            return Ok(Vec::new());
        }
        let filter = format!("docker_image_digest=in=({})", digests.join(","));
        let path = format!("/v1/images?filter={}", encode_query(&filter));
        let response = self.call(ctx, Method::Get, &path, None)?;
        let page: Page<CertImage> = decode(response, "find images")?;
        Ok(page.data)
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse, operation: &'static str) -> Result<T, CatalogError> {
    if !response.is_success() {
        return Err(CatalogError::Status {
            status: response.status,
            operation,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|source| CatalogError::Decode { operation, source })
}

fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
