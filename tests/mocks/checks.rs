//! Scripted checks.

use cert_preflight::checks::{Check, CheckError, CheckLevel, CheckMetadata, CheckRegistry, HelpText};
use cert_preflight::engine::{ImageReference, RunContext};
use cert_preflight::policy::Policy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What a [`StubCheck`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

/// A check with a fixed verdict that counts its invocations.
pub struct StubCheck {
    name: String,
    verdict: Verdict,
    calls: AtomicUsize,
}

impl StubCheck {
    pub fn new(name: &str, verdict: Verdict) -> Arc<Self> {
        Arc::new(StubCheck {
            name: name.to_string(),
            verdict,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn passing(name: &str) -> Arc<Self> {
        Self::new(name, Verdict::Pass)
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(name, Verdict::Fail)
    }

    pub fn erroring(name: &str) -> Arc<Self> {
        Self::new(name, Verdict::Error)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Check for StubCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, _ctx: &RunContext, _target: &ImageReference) -> Result<bool, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.verdict {
            Verdict::Pass => Ok(true),
            Verdict::Fail => Ok(false),
            Verdict::Error => Err(CheckError::new(format!("{} could not inspect the image", self.name))),
        }
    }

    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            description: format!("Verifies {}", self.name),
            level: CheckLevel::Best,
            knowledge_base_url: Some(format!("https://kb.example.com/{}", self.name)),
            check_url: Some(format!("https://docs.example.com/checks/{}", self.name)),
        }
    }

    fn help(&self) -> HelpText {
        HelpText {
            message: format!("Check {} encountered an error.", self.name),
            suggestion: format!("Fix whatever {} complains about.", self.name),
        }
    }
}

/// Registry holding a check for every name any policy uses, all with the
/// verdict chosen by `verdict_for`.
pub fn full_registry<F>(verdict_for: F) -> CheckRegistry
where
    F: Fn(&str) -> Verdict,
{
    let mut registry = CheckRegistry::new();
    for policy in Policy::ALL {
        for name in policy.check_names() {
            registry.register(StubCheck::new(name, verdict_for(name)));
        }
    }
    registry
}

/// Upcast stubs for APIs that take `Arc<dyn Check>`.
pub fn as_checks(stubs: &[Arc<StubCheck>]) -> Vec<Arc<dyn Check>> {
    stubs.iter().map(|s| Arc::clone(s) as Arc<dyn Check>).collect()
}
