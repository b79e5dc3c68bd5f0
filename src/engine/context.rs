//! Run-scoped execution context.
//!
//! A [`RunContext`] is created once per run and handed to the engine, to
//! every check, and to the submitter. It carries the run's artifact store,
//! its execution log, and its cancellation token, so two runs in one process
//! never share any of them.

use crate::artifacts::{ArtifactStore, MapArtifactStore};
use crate::logging::ExecutionLog;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Everything a run shares with the code it drives.
#[derive(Clone)]
pub struct RunContext {
    artifacts: Arc<dyn ArtifactStore>,
    log: ExecutionLog,
    cancellation: CancellationToken,
}

impl RunContext {
    /// Create a context writing evidence into `artifacts`.
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        RunContext {
            artifacts,
            log: ExecutionLog::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Context backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MapArtifactStore::new()))
    }

    /// Use `log` as this run's execution log.
    pub fn with_log(mut self, log: ExecutionLog) -> Self {
        self.log = log;
        self
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn artifacts(&self) -> &dyn ArtifactStore {
        self.artifacts.as_ref()
    }

    /// Shared handle to the artifact store.
    pub fn artifact_store(&self) -> Arc<dyn ArtifactStore> {
        Arc::clone(&self.artifacts)
    }

    pub fn log(&self) -> &ExecutionLog {
        &self.log
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("artifacts", &self.artifacts.path())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
