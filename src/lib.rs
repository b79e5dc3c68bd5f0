//! cert-preflight library
//!
//! Certification preflight for container images and operator bundles.
//!
//! A run resolves a policy, executes the policy's checks against one target,
//! writes the report and execution log into a run-scoped artifact store, and
//! optionally submits that evidence to the certification catalog.
//!
//! - [`checks`]: the check contract and the registry policies draw from
//! - [`policy`]: policies and policy resolution
//! - [`engine`]: run context, target resolution, check execution, results
//! - [`artifacts`]: filesystem and in-memory artifact stores
//! - [`catalog`]: certification catalog client and submission payloads
//! - [`submit`]: result submitters
//!
//! # Example
//!
//! ```no_run
//! use cert_preflight::checks::CheckRegistry;
//! use cert_preflight::engine::RunContext;
//! use cert_preflight::policy::Policy;
//! use cert_preflight::{Preflight, PreflightConfig};
//!
//! let registry = CheckRegistry::new(); // populated by the caller
//! let mut config = PreflightConfig::for_image("quay.io/example/app:1.0");
//! config.policy = Some(Policy::Container);
//!
//! let ctx = RunContext::in_memory();
//! let report = Preflight::new(config, registry).run(&ctx).expect("run failed");
//! println!("passed: {}", report.results.passed_overall());
//! ```

pub mod artifacts;
pub mod catalog;
pub mod checks;
pub mod cli;
pub mod engine;
pub mod logging;
pub mod policy;
pub mod submit;
pub mod version;

use artifacts::{ArtifactError, DEFAULT_ARTIFACTS_DIR, JUNIT_RESULTS_FILENAME, LOG_FILENAME, TEST_RESULTS_FILENAME};
use catalog::{normalize_project_id, CatalogClient, CatalogConfig, CatalogError, DEFAULT_CATALOG_ENV};
use checks::CheckRegistry;
use cli::output::{formatter_for, FormatError, OutputFormat};
use engine::{CheckEngine, EngineError, PolicyEngine, ReferenceResolver, RunContext, TargetResolver};
use policy::{Policy, PolicyError, PolicyResolver};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use submit::{resolve_submitter, SubmissionOutcome, SubmitError};
use thiserror::Error;
use tracing::{info, warn};

pub use engine::result::Results;
pub use version::LibraryInfo;

/// Fatal errors of a run. Check failures and submission failures are not
/// reported here; see [`RunReport`].
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("could not render report")]
    Format(#[from] FormatError),

    #[error("could not write run artifacts")]
    Artifact(#[from] ArtifactError),

    #[error("could not create catalog client")]
    Catalog(#[from] CatalogError),

    #[error("check engine completed without producing results")]
    MissingResults,

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Run configuration.
#[derive(Debug, Clone)]
pub struct PreflightConfig {
    /// Target image reference
    pub image: String,
    /// Explicit policy; resolved from the catalog when unset
    pub policy: Option<Policy>,
    /// Format of the primary report
    pub format: OutputFormat,
    /// Also write `results-junit.xml`
    pub write_junit: bool,
    /// Submit results to the catalog after the run
    pub submit: bool,
    pub artifacts_dir: PathBuf,
    pub docker_config: Option<PathBuf>,
    pub certification_project_id: Option<String>,
    pub catalog_host: Option<String>,
    pub catalog_env: String,
    pub api_token: Option<SecretString>,
    /// Filter for the run's log when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        PreflightConfig {
            image: String::new(),
            policy: None,
            format: OutputFormat::Json,
            write_junit: false,
            submit: false,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            docker_config: None,
            certification_project_id: None,
            catalog_host: None,
            catalog_env: DEFAULT_CATALOG_ENV.to_string(),
            api_token: None,
            log_level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl PreflightConfig {
    pub fn for_image(image: impl Into<String>) -> Self {
        PreflightConfig {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Configuration from `PFLT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = PreflightConfig::default();

        if let Some(dir) = get("PFLT_ARTIFACTS") {
            config.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(id) = get("PFLT_CERTIFICATION_PROJECT_ID") {
            config.set_certification_project_id(&id);
        }
        if let Some(token) = get("PFLT_PYXIS_API_TOKEN") {
            config.api_token = Some(SecretString::from(token));
        }
        config.catalog_host = get("PFLT_PYXIS_HOST");
        if let Some(env) = get("PFLT_PYXIS_ENV") {
            config.catalog_env = env;
        }
        config.docker_config = get("PFLT_DOCKERCONFIG").map(PathBuf::from);
        config.write_junit = get("PFLT_JUNIT").is_some_and(|v| parse_bool(&v));
        config.submit = get("PFLT_SUBMIT").is_some_and(|v| parse_bool(&v));
        if let Some(level) = get("PFLT_LOGLEVEL") {
            config.log_level = level;
        }
        config
    }

    /// Set the project id, stripping any `ospid-` prefix.
    pub fn set_certification_project_id(&mut self, id: &str) {
        let id = normalize_project_id(id);
        self.certification_project_id = (!id.is_empty()).then_some(id);
    }

    /// Catalog settings, when a project id and API token are both configured.
    pub fn catalog_config(&self) -> Option<CatalogConfig> {
        let project_id = self.certification_project_id.as_deref()?;
        let token = self.api_token.clone()?;
        let mut config = CatalogConfig::new(project_id, token);
        config.host = self.catalog_host.clone();
        config.env = self.catalog_env.clone();
        Some(config)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub policy: Policy,
    pub results: Results,
    /// Paths of every artifact written by the pipeline
    pub artifacts: Vec<PathBuf>,
    /// Kept apart from `results`: a run can pass and still fail to submit.
    pub submission: Result<SubmissionOutcome, SubmitError>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.results.passed_overall()
    }
}

/// Composes policy resolution, check execution, reporting, and submission.
pub struct Preflight {
    config: PreflightConfig,
    registry: CheckRegistry,
    catalog: Option<Arc<dyn CatalogClient>>,
    resolver: Arc<dyn TargetResolver>,
    library: LibraryInfo,
}

impl Preflight {
    pub fn new(config: PreflightConfig, registry: CheckRegistry) -> Self {
        Preflight {
            config,
            registry,
            catalog: None,
            resolver: Arc::new(ReferenceResolver),
            library: version::get_build_info().library_info(),
        }
    }

    /// Use `catalog` for policy exceptions and submission.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the target precondition hook.
    pub fn with_target_resolver(mut self, resolver: Arc<dyn TargetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &PreflightConfig {
        &self.config
    }

    /// Execute one run in `ctx`.
    pub fn run(&self, ctx: &RunContext) -> Result<RunReport, PreflightError> {
        if self.config.image.trim().is_empty() {
            return Err(PreflightError::Config("no image was given".to_string()));
        }
        let _capture = logging::capture_run(ctx.log(), &self.config.log_level);

        let policy = PolicyResolver::new().resolve_from_catalog(ctx, self.config.policy, self.catalog.as_deref())?;
        let checks = self.registry.checks_for(policy)?;
        info!(%policy, image = %self.config.image, checks = checks.len(), "starting preflight run");

        let mut engine = PolicyEngine::new(self.config.image.clone(), checks).with_resolver(Arc::clone(&self.resolver));
        engine.execute_checks(ctx)?;
        let results = engine.results(ctx).ok_or(PreflightError::MissingResults)?;

        let mut artifacts = Vec::new();
        let json = formatter_for(OutputFormat::Json, self.library.clone(), false)?;
        artifacts.push(ctx.artifacts().write_bytes(TEST_RESULTS_FILENAME, &json.format(&results)?)?);

        if self.config.write_junit {
            let junit = formatter_for(OutputFormat::Junit, self.library.clone(), false)?;
            artifacts.push(ctx.artifacts().write_bytes(JUNIT_RESULTS_FILENAME, &junit.format(&results)?)?);
        }

        if results.passed_overall() {
            info!("preflight run passed");
        } else {
            warn!(failed = results.failed.len(), errored = results.errors.len(), "preflight run did not pass");
        }

        // Persisted last so it holds every line of the run.
        artifacts.push(ctx.artifacts().write_bytes(LOG_FILENAME, &ctx.log().contents())?);

        let submission = self.submitter().submit(ctx);
        if let Err(ref e) = submission {
            warn!(error = %e, "submission failed");
        }

        Ok(RunReport {
            policy,
            results,
            artifacts,
            submission,
        })
    }

    /// Render `results` in the configured output format.
    pub fn render(&self, results: &Results, color: bool) -> Result<Vec<u8>, PreflightError> {
        let formatter = formatter_for(self.config.format, self.library.clone(), color)?;
        Ok(formatter.format(results)?)
    }

    /// Submit the artifacts already present in `ctx`'s store.
    pub fn submit_existing(&self, ctx: &RunContext) -> Result<SubmissionOutcome, SubmitError> {
        self.submitter().submit(ctx)
    }

    fn submitter(&self) -> Box<dyn submit::ResultSubmitter> {
        resolve_submitter(
            self.config.submit,
            self.catalog.clone(),
            self.config.certification_project_id.as_deref().unwrap_or_default(),
            self.config.docker_config.clone(),
        )
    }
}
