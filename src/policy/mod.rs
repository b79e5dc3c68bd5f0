//! Policies and policy resolution.
//!
//! A policy is a named, ordered list of check names. The order defines the
//! order of execution and of every rendered report.
//!
//! Resolution precedence, highest first:
//! 1. an explicitly selected policy
//! 2. the scratch exception
//! 3. the privileged (root) exception
//! 4. the standard container policy
//!
//! A project flagged both scratch and privileged resolves to the scratch
//! policy: the root-exception policy carries package-database checks that
//! cannot run against an image with no package database.

use crate::catalog::{CatalogClient, CatalogError, ProjectRecord};
use crate::engine::context::RunContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

const CONTAINER_CHECKS: &[&str] = &[
    "HasLicense",
    "HasUniqueTag",
    "LayerCountAcceptable",
    "HasNoProhibitedPackages",
    "HasRequiredLabel",
    "RunAsNonRoot",
    "HasModifiedFiles",
    "BasedOnUbi",
];

const ROOT_EXCEPTION_CHECKS: &[&str] = &[
    "HasLicense",
    "HasUniqueTag",
    "LayerCountAcceptable",
    "HasNoProhibitedPackages",
    "HasRequiredLabel",
    "HasModifiedFiles",
    "BasedOnUbi",
];

const SCRATCH_CHECKS: &[&str] = &[
    "HasLicense",
    "HasUniqueTag",
    "LayerCountAcceptable",
    "HasRequiredLabel",
    "RunAsNonRoot",
];

const OPERATOR_CHECKS: &[&str] = &[
    "ScorecardBasicSpecCheck",
    "ScorecardOlmSuiteCheck",
    "DeployableByOLM",
    "ValidateOperatorBundle",
    "CertifiedImages",
    "SecurityContextConstraintsInCSV",
    "RelatedImages",
];

/// A class of target and the checks that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Standard container policy
    Container,
    /// Container policy for images built from scratch
    Scratch,
    /// Container policy tolerating root execution
    Root,
    /// Operator bundle policy
    Operator,
}

impl Policy {
    pub const ALL: [Policy; 4] = [Policy::Container, Policy::Scratch, Policy::Root, Policy::Operator];

    /// Check names of this policy, in execution order.
    pub fn check_names(&self) -> &'static [&'static str] {
        match self {
            Policy::Container => CONTAINER_CHECKS,
            Policy::Scratch => SCRATCH_CHECKS,
            Policy::Root => ROOT_EXCEPTION_CHECKS,
            Policy::Operator => OPERATOR_CHECKS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Container => "container",
            Policy::Scratch => "scratch",
            Policy::Root => "root",
            Policy::Operator => "operator",
        }
    }

    /// Human-readable title used in listings.
    pub fn title(&self) -> &'static str {
        match self {
            Policy::Container => "Container policy",
            Policy::Scratch => "Container policy with scratch exception",
            Policy::Root => "Container policy with root exception",
            Policy::Operator => "Operator policy",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "container" => Ok(Policy::Container),
            "scratch" => Ok(Policy::Scratch),
            "root" => Ok(Policy::Root),
            "operator" => Ok(Policy::Operator),
            _ => Err(PolicyError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Errors raised while choosing or assembling a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown policy '{0}'. Valid policies: container, scratch, root, operator")]
    UnknownPolicy(String),

    #[error("policy {policy} requires check '{check}', which is not registered")]
    UnknownCheck { policy: Policy, check: String },

    #[error("could not resolve policy exceptions: {0}")]
    Resolution(#[source] CatalogError),

    #[error("could not resolve policy exceptions: no certification project was returned")]
    EmptyProject,
}

/// Catalog-held project attributes that alter which policy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionMetadata {
    pub scratch: bool,
    pub privileged: bool,
}

impl From<&ProjectRecord> for ExceptionMetadata {
    fn from(project: &ProjectRecord) -> Self {
        let container = &project.container;
        ExceptionMetadata {
            scratch: container.os_content_type.eq_ignore_ascii_case("scratch")
                || container.kind.eq_ignore_ascii_case("scratch"),
            privileged: container.privileged,
        }
    }
}

/// Chooses the policy for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyResolver;

impl PolicyResolver {
    pub fn new() -> Self {
        PolicyResolver
    }

    /// Pick a policy from an explicit selection or exception metadata.
    pub fn resolve(&self, explicit: Option<Policy>, metadata: Option<&ExceptionMetadata>) -> Policy {
        if let Some(policy) = explicit {
            return policy;
        }

        match metadata {
            Some(m) if m.scratch => Policy::Scratch,
            Some(m) if m.privileged => Policy::Root,
            _ => Policy::Container,
        }
    }

    /// Resolve a policy, fetching exception metadata from the catalog when no
    /// policy was selected explicitly and a catalog client is available.
    pub fn resolve_from_catalog(
        &self,
        ctx: &RunContext,
        explicit: Option<Policy>,
        catalog: Option<&dyn CatalogClient>,
    ) -> Result<Policy, PolicyError> {
        if let Some(policy) = explicit {
            debug!(%policy, "using explicitly selected policy");
            return Ok(policy);
        }

        let Some(catalog) = catalog else {
            return Ok(self.resolve(None, None));
        };

        let project = catalog
            .get_project(ctx)
            .map_err(PolicyError::Resolution)?
            .ok_or(PolicyError::EmptyProject)?;

        let metadata = ExceptionMetadata::from(&project);
        debug!(project = %project.name, scratch = metadata.scratch, privileged = metadata.privileged, "fetched policy exceptions");

        let policy = self.resolve(None, Some(&metadata));
        info!(%policy, "resolved policy from certification project");
        Ok(policy)
    }
}
