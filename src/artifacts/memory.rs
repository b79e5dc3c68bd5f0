//! In-memory artifact store.

use super::{normalize_name, ArtifactError, ArtifactStore, ArtifactWriter};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Keeps artifacts in a map, with no filesystem side effects.
///
/// Paths returned by writes are the normalized artifact names.
#[derive(Debug, Default)]
pub struct MapArtifactStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    root: PathBuf,
}

impl MapArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored artifact.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactWriter for MapArtifactStore {
    fn write_file(&self, name: &str, contents: &mut dyn Read) -> Result<PathBuf, ArtifactError> {
        let normalized = normalize_name(name)?;

        // Read outside the lock; only the map update is serialized.
        let mut buf = Vec::new();
        contents
            .read_to_end(&mut buf)
            .map_err(|source| ArtifactError::Write {
                name: normalized.clone(),
                source,
            })?;

        debug!(artifact = %normalized, bytes = buf.len(), "stored artifact in memory");
        self.lock().insert(normalized.clone(), buf);
        Ok(self.root.join(normalized))
    }

    fn path(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for MapArtifactStore {
    fn read_file(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let normalized = normalize_name(name)?;
        self.lock()
            .get(&normalized)
            .cloned()
            .ok_or(ArtifactError::NotFound { name: normalized })
    }

    fn exists(&self, name: &str) -> bool {
        normalize_name(name)
            .map(|n| self.lock().contains_key(&n))
            .unwrap_or(false)
    }

    fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn reset(&self) -> Result<(), ArtifactError> {
        self.lock().clear();
        Ok(())
    }
}
