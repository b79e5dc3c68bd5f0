//! Target identity and precondition validation.
//!
//! Before any check runs, the engine asks a [`TargetResolver`] to turn the
//! user-supplied target into an [`ImageReference`]. A resolver failure is a
//! precondition failure: the run aborts and no results are produced.

use super::context::RunContext;
use std::fmt;
use thiserror::Error;

/// Registry assumed when a reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when a reference carries neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

/// The target could not be resolved before checks ran.
#[derive(Debug, Error)]
#[error("precondition failed for target '{target}': {reason}")]
pub struct PreconditionError {
    pub target: String,
    pub reason: String,
}

impl PreconditionError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        PreconditionError {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// A parsed container image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Reference as supplied by the user
    pub original: String,
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    /// `algorithm:hex` digest, when pinned or resolved
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse `[registry/]repository[:tag][@digest]`.
    pub fn parse(reference: &str) -> Result<Self, PreconditionError> {
        let fail = |reason: &str| PreconditionError::new(reference, reason);
        let trimmed = reference.trim();

        if trimmed.is_empty() {
            return Err(fail("image reference is empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(fail("image reference contains whitespace"));
        }

        let (name_and_tag, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest).map_err(|r| fail(&r))?;
                (name, Some(digest.to_string()))
            }
            None => (trimmed, None),
        };

        // A colon after the last slash separates the tag; a colon before it
        // belongs to a registry port.
        let last_slash = name_and_tag.rfind('/');
        let (name, tag) = match name_and_tag.rfind(':') {
            Some(colon) if last_slash.map_or(true, |s| colon > s) => {
                (&name_and_tag[..colon], Some(name_and_tag[colon + 1..].to_string()))
            }
            _ => (name_and_tag, None),
        };

        if let Some(ref t) = tag {
            if t.is_empty() || t.len() > 128 || !t.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)) {
                return Err(fail("invalid tag"));
            }
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if first.contains('.') || first.contains(':') || first == "localhost" => {
                (first.to_string(), rest.to_string())
            }
            _ => (DEFAULT_REGISTRY.to_string(), name.to_string()),
        };

        if repository.is_empty()
            || repository.starts_with('/')
            || repository.ends_with('/')
            || repository.contains("//")
            || !repository
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-/".contains(c))
        {
            return Err(fail("invalid repository name"));
        }

        let tag = match (tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            (t, _) => t,
        };

        Ok(ImageReference {
            original: reference.to_string(),
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Repository including registry, without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Return a copy pinned to `digest`.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

fn validate_digest(digest: &str) -> Result<(), String> {
    let (algorithm, hex) = digest
        .split_once(':')
        .ok_or_else(|| "digest must be of the form algorithm:hex".to_string())?;

    let expected_len = match algorithm {
        "sha256" => 64,
        "sha512" => 128,
        other => return Err(format!("unsupported digest algorithm '{}'", other)),
    };

    if hex.len() != expected_len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("malformed {} digest", algorithm));
    }
    Ok(())
}

/// Precondition hook run before any check executes.
pub trait TargetResolver: Send + Sync {
    /// Resolve `target`, or explain why the run cannot proceed.
    fn resolve(&self, ctx: &RunContext, target: &str) -> Result<ImageReference, PreconditionError>;
}

/// Resolver that only validates the reference syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

impl TargetResolver for ReferenceResolver {
    fn resolve(&self, _ctx: &RunContext, target: &str) -> Result<ImageReference, PreconditionError> {
        ImageReference::parse(target)
    }
}
