//! Result aggregation.
//!
//! The engine records one [`CheckOutcome`] per executed check into a
//! [`ResultAggregator`], which partitions them into the three ordered buckets
//! of [`Results`] and stamps the certification hash.

use super::target::ImageReference;
use crate::checks::{Check, CheckError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A check that reached a verdict.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub check: Arc<dyn Check>,
    pub elapsed: Duration,
}

impl CheckResult {
    pub fn name(&self) -> &str {
        self.check.name()
    }
}

/// A check that could not reach a verdict.
#[derive(Debug, Clone)]
pub struct ErroredCheck {
    pub check: Arc<dyn Check>,
    pub elapsed: Duration,
    pub error: Arc<CheckError>,
}

impl ErroredCheck {
    pub fn name(&self) -> &str {
        self.check.name()
    }
}

/// Classified outcome of a single check execution.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Passed(CheckResult),
    Failed(CheckResult),
    Errored(ErroredCheck),
}

impl CheckOutcome {
    pub fn check(&self) -> &Arc<dyn Check> {
        match self {
            CheckOutcome::Passed(r) | CheckOutcome::Failed(r) => &r.check,
            CheckOutcome::Errored(e) => &e.check,
        }
    }

    pub fn name(&self) -> &str {
        self.check().name()
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            CheckOutcome::Passed(r) | CheckOutcome::Failed(r) => r.elapsed,
            CheckOutcome::Errored(e) => e.elapsed,
        }
    }

    /// Short lowercase label: `passed`, `failed` or `errored`.
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Passed(_) => "passed",
            CheckOutcome::Failed(_) => "failed",
            CheckOutcome::Errored(_) => "errored",
        }
    }
}

/// Platform a target was tested on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersion {
    pub name: String,
    pub version: String,
}

impl Default for ClusterVersion {
    fn default() -> Self {
        ClusterVersion {
            name: "unknown".to_string(),
            version: "unknown".to_string(),
        }
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Aggregate outcome of one run.
///
/// `passed`, `failed` and `errors` partition the executed checks, each in
/// policy order.
#[derive(Debug, Clone, Default)]
pub struct Results {
    /// Image as the user supplied it
    pub tested_image: String,
    pub tested_on: ClusterVersion,
    pub certification_hash: Option<String>,
    pub passed: Vec<CheckResult>,
    pub failed: Vec<CheckResult>,
    pub errors: Vec<ErroredCheck>,
}

impl Results {
    /// True when no check failed or errored.
    pub fn passed_overall(&self) -> bool {
        self.failed.is_empty() && self.errors.is_empty()
    }

    /// Number of executed checks.
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.errors.len()
    }

    /// Total time spent inside checks.
    pub fn total_elapsed(&self) -> Duration {
        self.passed
            .iter()
            .chain(self.failed.iter())
            .map(|r| r.elapsed)
            .chain(self.errors.iter().map(|e| e.elapsed))
            .sum()
    }
}

/// Collects outcomes as the engine produces them.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    outcomes: Vec<CheckOutcome>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: CheckOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Partition the recorded outcomes into finalized [`Results`].
    pub fn finish(self, target: &ImageReference, tested_on: ClusterVersion) -> Results {
        let hash = certification_hash(target, &self.outcomes);

        let mut results = Results {
            tested_image: target.original.clone(),
            tested_on,
            certification_hash: Some(hash),
            ..Results::default()
        };

        for outcome in self.outcomes {
            match outcome {
                CheckOutcome::Passed(r) => results.passed.push(r),
                CheckOutcome::Failed(r) => results.failed.push(r),
                CheckOutcome::Errored(e) => results.errors.push(e),
            }
        }

        results
    }
}

/// SHA-256 fingerprint over the target identity and each outcome, in order.
pub fn certification_hash(target: &ImageReference, outcomes: &[CheckOutcome]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(target.to_string().as_bytes());
    hasher.update(b"\n");
    for outcome in outcomes {
        hasher.update(outcome.name().as_bytes());
        hasher.update(b"=");
        hasher.update(outcome.label().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
