//! Catalog records.
//!
//! Only the fields the preflight pipeline reads or writes are modeled;
//! anything else the catalog returns is kept in `extra` so a fetched record
//! can be sent back without losing data.

use crate::engine::report::UserResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A certification project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub container: ContainerInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Container-specific project settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os_content_type: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_config_json: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A repository an image is published to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRepository {
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Value>,
}

/// Certified image descriptor, as written to `cert-image.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertImage {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub certified: bool,
    #[serde(default)]
    pub docker_image_digest: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    #[serde(default)]
    pub repositories: Vec<ImageRepository>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpm {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpg: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

/// Package manifest, as written to `rpm-manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmManifest {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub rpms: Vec<Rpm>,
}

/// Preflight results attached to an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_project: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(flatten)]
    pub response: UserResponse,
}

/// Supporting file attached to a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogArtifact {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub cert_project: String,
    /// Base64-encoded file contents
    pub content: String,
    pub content_type: String,
    pub filename: String,
    pub file_size: u64,
    #[serde(default)]
    pub image_id: String,
}

/// Everything sent in one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificationInput {
    pub project: ProjectRecord,
    pub cert_image: CertImage,
    pub test_results: TestResults,
    pub rpm_manifest: RpmManifest,
    pub artifacts: Vec<CatalogArtifact>,
}

/// What the catalog created for a submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificationResults {
    pub cert_image: CertImage,
    pub test_results: Option<TestResults>,
    pub rpm_manifest: Option<RpmManifest>,
    pub artifacts: Vec<CatalogArtifact>,
}
