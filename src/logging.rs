//! Logging setup and the per-run execution log.
//!
//! Every run owns an [`ExecutionLog`]: an in-memory buffer that receives the
//! run's log lines and is persisted as `preflight.log` at the end of the run.
//! The binary installs a global subscriber with [`init`]. A run installs
//! [`capture_run`] on its own thread for its duration, so the buffer is
//! filled whether or not the caller set up logging.
//! [`capture_scoped`] captures arbitrary code into a buffer.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor a level is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Shared, append-only log buffer.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything logged so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append raw bytes.
    pub fn append(&self, bytes: &[u8]) {
        self.lock().extend_from_slice(bytes);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Writer handed out to `tracing-subscriber` for one event.
pub struct ExecutionLogWriter {
    log: ExecutionLog,
}

impl io::Write for ExecutionLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for ExecutionLog {
    type Writer = ExecutionLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ExecutionLogWriter { log: self.clone() }
    }
}

/// Install the process-wide subscriber.
///
/// Logs go to stderr, filtered by `RUST_LOG` when set and `level` otherwise.
/// When `capture` is given, an ANSI-free copy of every event is also written
/// into it.
pub fn init(level: &str, capture: Option<&ExecutionLog>) -> Result<(), TryInitError> {
    let capture_layer = capture.map(|log| {
        tracing_subscriber::fmt::layer()
            .with_writer(log.clone())
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(capture_layer)
        .try_init()
}

/// Route events on the current thread to stderr and into `log` until the
/// guard drops. Takes precedence over the global subscriber, so a run's
/// events reach stderr once and `log` once.
pub fn capture_run(log: &ExecutionLog, level: &str) -> DefaultGuard {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log.clone())
                .with_ansi(false),
        );
    tracing::subscriber::set_default(subscriber)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Route events on the current thread into `log` until the guard drops.
pub fn capture_scoped(log: &ExecutionLog, max_level: Level) -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .with_max_level(max_level)
        .finish();
    tracing::subscriber::set_default(subscriber)
}
