//! Submission payload assembly.
//!
//! [`CertificationInputBuilder`] takes the raw bytes of each artifact, parses
//! what needs parsing, and remembers every problem it hits. Nothing is
//! reported until [`CertificationInputBuilder::finalize`], which fails with
//! the full list so a user fixes everything in one pass.

use super::types::{CatalogArtifact, CertImage, CertificationInput, ProjectRecord, RpmManifest, TestResults};
use crate::engine::report::UserResponse;
use base64::Engine as _;
use thiserror::Error;

/// The payload was incomplete or malformed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("certification input is not valid: {}", .problems.join("; "))]
pub struct FinalizeError {
    pub problems: Vec<String>,
}

/// Accumulates the parts of a [`CertificationInput`].
#[derive(Debug)]
pub struct CertificationInputBuilder {
    project: ProjectRecord,
    cert_image: Option<CertImage>,
    test_results: Option<TestResults>,
    rpm_manifest: Option<RpmManifest>,
    artifacts: Vec<CatalogArtifact>,
    problems: Vec<String>,
}

impl CertificationInputBuilder {
    pub fn new(project: ProjectRecord) -> Self {
        CertificationInputBuilder {
            project,
            cert_image: None,
            test_results: None,
            rpm_manifest: None,
            artifacts: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Add the certified image descriptor.
    pub fn with_cert_image(mut self, contents: &[u8]) -> Self {
        match serde_json::from_slice::<CertImage>(contents) {
            Ok(mut image) => {
                // Submitted images are certified only after review.
                image.certified = false;
                self.cert_image = Some(image);
            }
            Err(e) => self.problems.push(format!("cert image could not be parsed: {}", e)),
        }
        self
    }

    /// Add the serialized preflight report.
    pub fn with_test_results(mut self, contents: &[u8]) -> Self {
        match serde_json::from_slice::<UserResponse>(contents) {
            Ok(response) => {
                if !response.is_consistent() {
                    self.problems
                        .push("test results disagree with their own passed flag".to_string());
                }
                self.test_results = Some(TestResults {
                    id: String::new(),
                    cert_project: self.project.id.clone(),
                    image_id: String::new(),
                    response,
                });
            }
            Err(e) => self.problems.push(format!("test results could not be parsed: {}", e)),
        }
        self
    }

    /// Add the package manifest.
    pub fn with_rpm_manifest(mut self, contents: &[u8]) -> Self {
        match serde_json::from_slice::<RpmManifest>(contents) {
            Ok(manifest) => self.rpm_manifest = Some(manifest),
            Err(e) => self.problems.push(format!("rpm manifest could not be parsed: {}", e)),
        }
        self
    }

    /// Attach an opaque file such as the execution log.
    pub fn with_artifact(mut self, contents: &[u8], filename: &str) -> Self {
        if filename.trim().is_empty() {
            self.problems.push("artifact filename is empty".to_string());
            return self;
        }

        self.artifacts.push(CatalogArtifact {
            id: String::new(),
            cert_project: self.project.id.clone(),
            content: base64::engine::general_purpose::STANDARD.encode(contents),
            content_type: content_type_for(filename).to_string(),
            filename: filename.to_string(),
            file_size: contents.len() as u64,
            image_id: String::new(),
        });
        self
    }

    /// Validate and return the payload.
    pub fn finalize(self) -> Result<CertificationInput, FinalizeError> {
        let mut problems = self.problems;

        if self.project.id.is_empty() {
            problems.push("project has no id".to_string());
        }
        if self.cert_image.is_none() && !problems.iter().any(|p| p.starts_with("cert image")) {
            problems.push("cert image is missing".to_string());
        }
        if self.test_results.is_none() && !problems.iter().any(|p| p.starts_with("test results")) {
            problems.push("test results are missing".to_string());
        }
        if self.rpm_manifest.is_none() && !problems.iter().any(|p| p.starts_with("rpm manifest")) {
            problems.push("rpm manifest is missing".to_string());
        }

        match (self.cert_image, self.test_results, self.rpm_manifest) {
            (Some(cert_image), Some(test_results), Some(rpm_manifest)) if problems.is_empty() => {
                Ok(CertificationInput {
                    project: self.project,
                    cert_image,
                    test_results,
                    rpm_manifest,
                    artifacts: self.artifacts,
                })
            }
            _ => Err(FinalizeError { problems }),
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        _ => "text/plain",
    }
}
