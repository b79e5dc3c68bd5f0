//! Certification catalog collaborator.
//!
//! The catalog is the external system of record for certification projects.
//! The pipeline talks to it through [`CatalogClient`]; [`HttpCatalogClient`]
//! is the production implementation, tests substitute their own.

mod client;
pub mod http;
mod input;
mod types;

pub use client::HttpCatalogClient;
pub use input::{CertificationInputBuilder, FinalizeError};
pub use types::{
    CatalogArtifact, CertImage, CertificationInput, CertificationResults, ContainerInfo, ImageRepository,
    ProjectRecord, Rpm, RpmManifest, TestResults,
};

use crate::engine::context::RunContext;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;

/// Environment used when none is configured.
pub const DEFAULT_CATALOG_ENV: &str = "prod";

const CONNECT_BASE_URL: &str = "https://connect.redhat.com/projects";

/// Errors talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTPS endpoints require the 'tls' feature")]
    TlsUnavailable,

    #[error("malformed catalog response: {0}")]
    Protocol(String),

    #[error("catalog returned status {status} for {operation}: {body}")]
    Status {
        status: u16,
        operation: &'static str,
        body: String,
    },

    #[error("could not decode catalog response for {operation}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode catalog request")]
    Encode(#[source] serde_json::Error),

    #[error("no certification project id is configured")]
    MissingProjectId,

    #[error("catalog call abandoned: run was cancelled")]
    Cancelled,
}

/// Operations the pipeline needs from the catalog.
pub trait CatalogClient: Send + Sync {
    /// Fetch the configured certification project. `Ok(None)` means the
    /// catalog answered but returned no project.
    fn get_project(&self, ctx: &RunContext) -> Result<Option<ProjectRecord>, CatalogError>;

    /// Submit a finalized payload. Called at most once per submission.
    fn submit_results(
        &self,
        ctx: &RunContext,
        input: &CertificationInput,
    ) -> Result<CertificationResults, CatalogError>;

    /// Look up images already known to the catalog.
    fn find_images_by_digest(&self, ctx: &RunContext, digests: &[String]) -> Result<Vec<CertImage>, CatalogError>;
}

/// Catalog API host for a named environment. Unknown names map to prod.
pub fn host_for_env(env: &str) -> &'static str {
    match env.trim().to_lowercase().as_str() {
        "uat" => "catalog.uat.redhat.com/api/containers",
        "qa" => "catalog.qa.redhat.com/api/containers",
        "stage" => "catalog.stage.redhat.com/api/containers",
        _ => "catalog.redhat.com/api/containers",
    }
}

/// Strip the `ospid-` prefix some project ids are shown with.
pub fn normalize_project_id(id: &str) -> String {
    let id = id.trim();
    id.strip_prefix("ospid-").unwrap_or(id).to_string()
}

/// Project overview page.
pub fn overview_url(project_id: &str) -> String {
    format!("{}/{}/overview", CONNECT_BASE_URL, project_id)
}

/// Scan results page for one submitted image.
pub fn scan_results_url(project_id: &str, image_id: &str) -> String {
    format!("{}/{}/images/{}/scan-results", CONNECT_BASE_URL, project_id, image_id)
}

/// Connection settings for the catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Explicit host; overrides `env`
    pub host: Option<String>,
    pub env: String,
    pub api_token: SecretString,
    pub project_id: String,
}

impl CatalogConfig {
    pub fn new(project_id: &str, api_token: SecretString) -> Self {
        CatalogConfig {
            host: None,
            env: DEFAULT_CATALOG_ENV.to_string(),
            api_token,
            project_id: normalize_project_id(project_id),
        }
    }

    /// Host requests go to.
    pub fn resolved_host(&self) -> String {
        match self.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => host_for_env(&self.env).to_string(),
        }
    }
}
