//! Check execution.
//!
//! [`PolicyEngine`] runs a resolved list of checks against one target.
//!
//! # Failure handling
//!
//! - Target resolution failure: fatal, no results are produced
//! - Cancellation: observed before each check, fatal, no results are produced
//! - Check returns an error: recorded as errored, the run continues
//! - Check panics: caught via `catch_unwind`, recorded as errored
//! - Empty check list: an empty, passing result
//!
//! Checks run strictly in order on the calling thread. The engine never
//! time-boxes a check; a check doing blocking I/O is responsible for its
//! own timeouts.

use super::context::RunContext;
use super::result::{CheckOutcome, CheckResult, ClusterVersion, ErroredCheck, ResultAggregator, Results};
use super::target::{ImageReference, PreconditionError, ReferenceResolver, TargetResolver};
use crate::checks::{Check, CheckError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal engine errors. Individual check errors are never reported here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("run cancelled after {completed} of {total} checks")]
    Cancelled { completed: usize, total: usize },
}

/// Executes checks and exposes their results.
pub trait CheckEngine {
    /// Run every check. Returns `Err` only for fatal conditions.
    fn execute_checks(&mut self, ctx: &RunContext) -> Result<(), EngineError>;

    /// Results of the last successful execution.
    fn results(&self, ctx: &RunContext) -> Option<Results>;
}

/// Sequential engine over a policy's check list.
pub struct PolicyEngine {
    image: String,
    checks: Vec<Arc<dyn Check>>,
    resolver: Arc<dyn TargetResolver>,
    tested_on: ClusterVersion,
    results: Option<Results>,
}

impl PolicyEngine {
    /// Engine for `image` that validates the reference before running.
    pub fn new(image: impl Into<String>, checks: Vec<Arc<dyn Check>>) -> Self {
        PolicyEngine {
            image: image.into(),
            checks,
            resolver: Arc::new(ReferenceResolver),
            tested_on: ClusterVersion::default(),
            results: None,
        }
    }

    /// Replace the precondition hook.
    pub fn with_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Record the platform the target is tested on.
    pub fn with_tested_on(mut self, tested_on: ClusterVersion) -> Self {
        self.tested_on = tested_on;
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    fn execute_check(&self, ctx: &RunContext, check: &Arc<dyn Check>, target: &ImageReference) -> CheckOutcome {
        let start = Instant::now();
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| check.validate(ctx, target)));
        let elapsed = start.elapsed();

        let check = Arc::clone(check);
        match verdict {
            Ok(Ok(true)) => CheckOutcome::Passed(CheckResult { check, elapsed }),
            Ok(Ok(false)) => CheckOutcome::Failed(CheckResult { check, elapsed }),
            Ok(Err(error)) => CheckOutcome::Errored(ErroredCheck {
                check,
                elapsed,
                error: Arc::new(error),
            }),
            Err(payload) => CheckOutcome::Errored(ErroredCheck {
                check,
                elapsed,
                error: Arc::new(CheckError::new(format!(
                    "check panicked: {}",
                    panic_message(payload.as_ref())
                ))),
            }),
        }
    }
}

impl CheckEngine for PolicyEngine {
    fn execute_checks(&mut self, ctx: &RunContext) -> Result<(), EngineError> {
        self.results = None;

        let target = self.resolver.resolve(ctx, &self.image)?;
        info!(target = %target, checks = self.checks.len(), "target verified, running checks");

        let total = self.checks.len();
        let mut aggregator = ResultAggregator::new();

        for (completed, check) in self.checks.iter().enumerate() {
            if ctx.is_cancelled() {
                warn!(completed, total, "run cancelled");
                return Err(EngineError::Cancelled { completed, total });
            }

            debug!(check = check.name(), "running check");
            let outcome = self.execute_check(ctx, check, &target);
            let elapsed_ms = outcome.elapsed().as_millis() as u64;

            match &outcome {
                CheckOutcome::Passed(_) => info!(check = check.name(), elapsed_ms, "check passed"),
                CheckOutcome::Failed(_) => warn!(check = check.name(), elapsed_ms, "check failed"),
                CheckOutcome::Errored(e) => {
                    warn!(check = check.name(), elapsed_ms, error = %e.error, "check errored")
                }
            }

            aggregator.record(outcome);
        }

        let results = aggregator.finish(&target, self.tested_on.clone());
        info!(
            passed = results.passed.len(),
            failed = results.failed.len(),
            errored = results.errors.len(),
            "check execution complete"
        );
        self.results = Some(results);
        Ok(())
    }

    fn results(&self, _ctx: &RunContext) -> Option<Results> {
        self.results.clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
