//! Result submission.
//!
//! After a run, the pipeline hands its context to a [`ResultSubmitter`].
//! [`NoopSubmitter`] only explains why nothing was sent; [`CatalogSubmitter`]
//! reads the run's evidence back out of the artifact store and submits it to
//! the certification catalog.
//!
//! Submission failures are reported separately from check outcomes: a run can
//! pass locally and still fail to submit. Nothing persisted locally is removed
//! when submission fails.

use crate::artifacts::{
    ArtifactError, CERT_IMAGE_FILENAME, LOG_FILENAME, RPM_MANIFEST_FILENAME, TEST_RESULTS_FILENAME,
};
use crate::catalog::{
    overview_url, scan_results_url, CatalogClient, CatalogError, CertificationInputBuilder, FinalizeError,
};
use crate::engine::context::RunContext;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// What a submitter did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Nothing was sent.
    Skipped { reason: Option<String> },
    /// The catalog accepted the submission.
    Submitted(SubmissionReceipt),
}

/// Identifiers of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub project_id: String,
    pub image_id: String,
    pub scan_results_url: String,
    pub overview_url: String,
}

/// Submission failures. None of them are retried.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not open file for submission: {name}")]
    MissingArtifact {
        name: String,
        #[source]
        source: ArtifactError,
    },

    #[error("could not read docker config {}", .path.display())]
    DockerConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not retrieve project")]
    Project(#[source] CatalogError),

    #[error("no certification project was returned from the catalog")]
    EmptyProject,

    #[error("unable to finalize data that would be sent to the catalog")]
    Finalize(#[source] FinalizeError),

    #[error("could not submit to the catalog")]
    Catalog(#[source] CatalogError),

    #[error("submission cancelled")]
    Cancelled,
}

/// Sends (or declines to send) a run's results.
pub trait ResultSubmitter: Send + Sync {
    fn submit(&self, ctx: &RunContext) -> Result<SubmissionOutcome, SubmitError>;
}

/// Submits nothing, optionally logging why.
#[derive(Debug, Clone, Default)]
pub struct NoopSubmitter {
    pub emit_log: bool,
    pub reason: Option<String>,
}

impl NoopSubmitter {
    pub fn new(emit_log: bool, reason: Option<String>) -> Self {
        NoopSubmitter { emit_log, reason }
    }

    /// The line logged on submit.
    pub fn message(&self) -> String {
        let mut msg = "Results are not being sent for submission.".to_string();
        if let Some(reason) = self.reason.as_deref().filter(|r| !r.is_empty()) {
            msg.push_str(&format!(" Reason: {}.", reason));
        }
        msg
    }
}

impl ResultSubmitter for NoopSubmitter {
    fn submit(&self, _ctx: &RunContext) -> Result<SubmissionOutcome, SubmitError> {
        if self.emit_log {
            info!("{}", self.message());
        }
        Ok(SubmissionOutcome::Skipped {
            reason: self.reason.clone(),
        })
    }
}

/// Submits container results to the catalog.
pub struct CatalogSubmitter {
    catalog: Arc<dyn CatalogClient>,
    project_id: String,
    docker_config: Option<PathBuf>,
}

impl CatalogSubmitter {
    pub fn new(catalog: Arc<dyn CatalogClient>, project_id: impl Into<String>) -> Self {
        CatalogSubmitter {
            catalog,
            project_id: project_id.into(),
            docker_config: None,
        }
    }

    /// Attach a registry credentials file to the project on submission.
    pub fn with_docker_config(mut self, path: Option<PathBuf>) -> Self {
        self.docker_config = path;
        self
    }

    fn read_artifact(ctx: &RunContext, name: &str) -> Result<Vec<u8>, SubmitError> {
        ctx.artifacts()
            .read_file(name)
            .map_err(|source| SubmitError::MissingArtifact {
                name: name.to_string(),
                source,
            })
    }
}

impl ResultSubmitter for CatalogSubmitter {
    fn submit(&self, ctx: &RunContext) -> Result<SubmissionOutcome, SubmitError> {
        info!("preparing results that will be submitted to the certification catalog");

        // Every local input is read before the first network call.
        let cert_image = Self::read_artifact(ctx, CERT_IMAGE_FILENAME)?;
        let test_results = Self::read_artifact(ctx, TEST_RESULTS_FILENAME)?;
        let rpm_manifest = Self::read_artifact(ctx, RPM_MANIFEST_FILENAME)?;
        let log = Self::read_artifact(ctx, LOG_FILENAME)?;

        let docker_config = match &self.docker_config {
            Some(path) => Some(fs::read_to_string(path).map_err(|source| SubmitError::DockerConfig {
                path: path.clone(),
                source,
            })?),
            None => None,
        };

        if ctx.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }

        let mut project = self
            .catalog
            .get_project(ctx)
            .map_err(SubmitError::Project)?
            .ok_or(SubmitError::EmptyProject)?;
        trace!(project = ?project, "fetched certification project");

        if let Some(config) = docker_config {
            project.container.docker_config_json = config;
        }

        let input = CertificationInputBuilder::new(project)
            .with_cert_image(&cert_image)
            .with_test_results(&test_results)
            .with_rpm_manifest(&rpm_manifest)
            .with_artifact(&log, LOG_FILENAME)
            .finalize()
            .map_err(SubmitError::Finalize)?;
        debug!(artifacts = input.artifacts.len(), "submission payload finalized");

        if ctx.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }

        let created = self
            .catalog
            .submit_results(ctx, &input)
            .map_err(SubmitError::Catalog)?;

        let receipt = SubmissionReceipt {
            project_id: self.project_id.clone(),
            image_id: created.cert_image.id.clone(),
            scan_results_url: scan_results_url(&self.project_id, &created.cert_image.id),
            overview_url: overview_url(&self.project_id),
        };

        info!("Test results have been submitted to the certification catalog.");
        info!("These results will be reviewed for final certification.");
        info!("The container's image id is: {}.", receipt.image_id);
        info!("Please check {} to view scan results.", receipt.scan_results_url);
        info!("Please check {} to monitor the progress.", receipt.overview_url);

        Ok(SubmissionOutcome::Submitted(receipt))
    }
}

/// Pick the submitter for a run.
///
/// The catalog variant is only used when submission was requested and a
/// catalog client exists; otherwise a noop explains why nothing is sent.
pub fn resolve_submitter(
    submit: bool,
    catalog: Option<Arc<dyn CatalogClient>>,
    project_id: &str,
    docker_config: Option<PathBuf>,
) -> Box<dyn ResultSubmitter> {
    match (submit, catalog) {
        (true, Some(catalog)) => {
            Box::new(CatalogSubmitter::new(catalog, project_id).with_docker_config(docker_config))
        }
        (true, None) => Box::new(NoopSubmitter::new(
            true,
            Some("no catalog client is configured".to_string()),
        )),
        (false, _) => Box::new(NoopSubmitter::new(true, None)),
    }
}
