//! Filesystem-backed artifact store.

use super::{normalize_name, ArtifactError, ArtifactStore, ArtifactWriter, DEFAULT_ARTIFACTS_DIR};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Stores artifacts as files under a run-scoped directory.
///
/// The directory is created on first write. Writes are serialized so that
/// concurrent writers cannot interleave on the same file.
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FsArtifactStore {
    /// Create a store rooted at `dir`. Relative paths are resolved against
    /// the current working directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FsArtifactStore {
            root: resolve_full_path(dir.as_ref()),
            lock: Mutex::new(()),
        }
    }

    /// Store rooted at `./artifacts`.
    pub fn with_default_dir() -> Self {
        Self::new(DEFAULT_ARTIFACTS_DIR)
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A poisoned lock only means another writer panicked; the guarded
        // state lives on disk, so continue.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactWriter for FsArtifactStore {
    fn write_file(&self, name: &str, contents: &mut dyn Read) -> Result<PathBuf, ArtifactError> {
        let normalized = normalize_name(name)?;
        let full_path = self.root.join(&normalized);
        let write_err = |source: io::Error| ArtifactError::Write {
            name: normalized.clone(),
            source,
        };

        let _guard = self.guard();

        let parent = full_path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(write_err)?;

        // Staged beside the target; a failed write leaves the previous
        // content in place.
        let mut staged = NamedTempFile::new_in(parent).map_err(write_err)?;
        let written = io::copy(contents, &mut staged).map_err(write_err)?;
        staged.flush().map_err(write_err)?;
        staged.persist(&full_path).map_err(|e| write_err(e.error))?;

        debug!(artifact = %normalized, bytes = written, path = %full_path.display(), "wrote artifact");
        Ok(full_path)
    }

    fn path(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for FsArtifactStore {
    fn read_file(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let normalized = normalize_name(name)?;
        let full_path = self.root.join(&normalized);

        fs::read(&full_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ArtifactError::NotFound { name: normalized }
            } else {
                ArtifactError::Read {
                    name: normalized,
                    source,
                }
            }
        })
    }

    fn exists(&self, name: &str) -> bool {
        normalize_name(name)
            .map(|n| self.root.join(n).is_file())
            .unwrap_or(false)
    }

    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&self.root, "", &mut names);
        names.sort();
        names
    }

    fn reset(&self) -> Result<(), ArtifactError> {
        let _guard = self.guard();

        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                trace!(path = %self.root.display(), "reset artifacts directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ArtifactError::Reset {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

fn collect_names(dir: &Path, prefix: &str, names: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", prefix, file_name)
        };

        match entry.file_type() {
            Ok(t) if t.is_dir() => collect_names(&entry.path(), &name, names),
            Ok(t) if t.is_file() => names.push(name),
            _ => {}
        }
    }
}

/// Resolve `p` to an absolute path if it is relative.
fn resolve_full_path(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(p))
        .unwrap_or_else(|_| p.to_path_buf())
}
