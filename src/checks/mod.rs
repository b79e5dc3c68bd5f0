//! Check capability contract and the registry policies draw from.
//!
//! Individual checks are supplied by the composition root. The engine only
//! ever sees them through [`Check`]: a name, a validation entry point,
//! descriptive metadata, and remediation help.
//!
//! # Outcome semantics
//!
//! - `Ok(true)`: the target satisfies the check
//! - `Ok(false)`: the target does not satisfy the check
//! - `Err(_)`: the check could not reach a verdict
//!
//! Checks must not assume anything about other checks in the same run.

use crate::engine::context::RunContext;
use crate::engine::target::ImageReference;
use crate::policy::{Policy, PolicyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Severity level of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    #[default]
    Best,
    Good,
    Optional,
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckLevel::Best => write!(f, "best"),
            CheckLevel::Good => write!(f, "good"),
            CheckLevel::Optional => write!(f, "optional"),
        }
    }
}

/// Descriptive fields of a check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckMetadata {
    pub description: String,
    pub level: CheckLevel,
    pub knowledge_base_url: Option<String>,
    pub check_url: Option<String>,
}

/// Remediation text shown when a check does not pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpText {
    pub message: String,
    pub suggestion: String,
}

/// Error returned by a check that could not reach a verdict.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CheckError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CheckError {
    pub fn new(message: impl Into<String>) -> Self {
        CheckError {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error with context.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        CheckError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::artifacts::ArtifactError> for CheckError {
    fn from(e: crate::artifacts::ArtifactError) -> Self {
        CheckError::with_source("could not capture check evidence", e)
    }
}

/// A single certification test against a target.
pub trait Check: Send + Sync {
    /// Stable, unique name. Policies refer to checks by this name.
    fn name(&self) -> &str;

    /// Run the check against `target`.
    fn validate(&self, ctx: &RunContext, target: &ImageReference) -> Result<bool, CheckError>;

    fn metadata(&self) -> CheckMetadata;

    fn help(&self) -> HelpText;
}

impl fmt::Debug for dyn Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name()).finish()
    }
}

/// Explicit set of available checks, keyed by name.
#[derive(Default, Clone)]
pub struct CheckRegistry {
    checks: BTreeMap<String, Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check, replacing any check previously registered under the
    /// same name. Returns the replaced check, if any.
    pub fn register(&mut self, check: Arc<dyn Check>) -> Option<Arc<dyn Check>> {
        self.checks.insert(check.name().to_string(), check)
    }

    /// Register several checks at once.
    pub fn register_all<I>(&mut self, checks: I)
    where
        I: IntoIterator<Item = Arc<dyn Check>>,
    {
        for check in checks {
            self.register(check);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Check>> {
        self.checks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Names of all registered checks, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.checks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Assemble the checks of `policy`, in policy order.
    ///
    /// Fails on the first check name the registry cannot supply.
    pub fn checks_for(&self, policy: Policy) -> Result<Vec<Arc<dyn Check>>, PolicyError> {
        policy
            .check_names()
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| PolicyError::UnknownCheck {
                    policy,
                    check: (*name).to_string(),
                })
            })
            .collect()
    }
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("checks", &self.names())
            .finish()
    }
}
