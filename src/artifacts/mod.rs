//! Run-scoped evidence storage.
//!
//! Every run owns exactly one artifact store. Checks write evidence into it
//! while they execute, the run pipeline writes the rendered report and the
//! execution log into it, and the catalog submitter reads a fixed set of
//! files back out of it.
//!
//! Two backings are provided:
//! - [`FsArtifactStore`]: files under a directory created on first write
//! - [`MapArtifactStore`]: an in-memory map for embedded use
//!
//! Names are relative paths. Writing a name that already exists replaces its
//! content and returns the same path.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MapArtifactStore;

use std::io::Read;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default artifacts directory, relative to the working directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Certified image descriptor written by the image resolution step.
pub const CERT_IMAGE_FILENAME: &str = "cert-image.json";

/// Serialized results report.
pub const TEST_RESULTS_FILENAME: &str = "results.json";

/// Package manifest of the tested image.
pub const RPM_MANIFEST_FILENAME: &str = "rpm-manifest.json";

/// Execution log of the run.
pub const LOG_FILENAME: &str = "preflight.log";

/// JUnit rendering of the results.
pub const JUNIT_RESULTS_FILENAME: &str = "results-junit.xml";

/// Artifacts the catalog submitter requires, in the order it reads them.
pub const REQUIRED_SUBMISSION_ARTIFACTS: [&str; 4] = [
    CERT_IMAGE_FILENAME,
    TEST_RESULTS_FILENAME,
    RPM_MANIFEST_FILENAME,
    LOG_FILENAME,
];

/// Errors raised by artifact stores.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("artifact not found: {name}")]
    NotFound { name: String },

    #[error("could not write artifact {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read artifact {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not reset artifacts at {}: {source}", path.display())]
    Reset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    /// Name of the artifact involved, when there is one.
    pub fn artifact_name(&self) -> Option<&str> {
        match self {
            ArtifactError::InvalidName { name, .. }
            | ArtifactError::NotFound { name }
            | ArtifactError::Write { name, .. }
            | ArtifactError::Read { name, .. } => Some(name),
            ArtifactError::Reset { .. } => None,
        }
    }
}

/// Write access to a run's artifacts.
pub trait ArtifactWriter: Send + Sync {
    /// Write `contents` under `name`, replacing any previous content.
    ///
    /// Returns the resolved path of the artifact.
    fn write_file(&self, name: &str, contents: &mut dyn Read) -> Result<PathBuf, ArtifactError>;

    /// Root location of the artifacts.
    fn path(&self) -> &Path;

    /// Convenience wrapper around [`ArtifactWriter::write_file`] for in-memory bytes.
    fn write_bytes(&self, name: &str, contents: &[u8]) -> Result<PathBuf, ArtifactError> {
        let mut reader = contents;
        self.write_file(name, &mut reader)
    }
}

/// Full artifact lifecycle: write, read back, enumerate, reset.
pub trait ArtifactStore: ArtifactWriter {
    /// Read an artifact's complete content.
    fn read_file(&self, name: &str) -> Result<Vec<u8>, ArtifactError>;

    /// Whether an artifact with this name exists.
    fn exists(&self, name: &str) -> bool;

    /// Names of all stored artifacts, sorted.
    fn names(&self) -> Vec<String>;

    /// Discard every artifact of the run.
    fn reset(&self) -> Result<(), ArtifactError>;
}

/// Validate an artifact name and normalize it to forward-slash form.
pub(crate) fn normalize_name(name: &str) -> Result<String, ArtifactError> {
    let invalid = |reason| ArtifactError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }

    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory references are not allowed")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute paths are not allowed"))
            }
        }
    }

    if parts.is_empty() {
        return Err(invalid("name has no file component"));
    }

    Ok(parts.join("/"))
}
