//! In-process certification catalog.

use cert_preflight::catalog::{
    CatalogClient, CatalogError, CertImage, CertificationInput, CertificationResults, ContainerInfo, ProjectRecord,
};
use cert_preflight::engine::RunContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records every call and answers from configured state.
#[derive(Default)]
pub struct FakeCatalogClient {
    project: Option<ProjectRecord>,
    fail_project: bool,
    fail_submit: bool,
    get_project_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    find_calls: AtomicUsize,
    last_input: Mutex<Option<CertificationInput>>,
}

impl FakeCatalogClient {
    /// Client whose project carries the given exception flags.
    pub fn with_project(scratch: bool, privileged: bool) -> Self {
        let project = ProjectRecord {
            id: "p-100".to_string(),
            name: "demo".to_string(),
            container: ContainerInfo {
                os_content_type: if scratch { "scratch".to_string() } else { String::new() },
                privileged,
                ..Default::default()
            },
            ..Default::default()
        };
        FakeCatalogClient {
            project: Some(project),
            ..Default::default()
        }
    }

    /// Client that answers with no project.
    pub fn without_project() -> Self {
        FakeCatalogClient::default()
    }

    /// Client whose every project lookup fails.
    pub fn unreachable() -> Self {
        FakeCatalogClient {
            fail_project: true,
            ..Default::default()
        }
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn get_project_calls(&self) -> usize {
        self.get_project_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.get_project_calls() + self.submit_calls() + self.find_calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<CertificationInput> {
        self.last_input.lock().ok().and_then(|guard| guard.clone())
    }
}

impl CatalogClient for FakeCatalogClient {
    fn get_project(&self, _ctx: &RunContext) -> Result<Option<ProjectRecord>, CatalogError> {
        self.get_project_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_project {
            return Err(CatalogError::Transport("connection refused".to_string()));
        }
        Ok(self.project.clone())
    }

    fn submit_results(&self, _ctx: &RunContext, input: &CertificationInput) -> Result<CertificationResults, CatalogError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = Some(input.clone());
        }
        if self.fail_submit {
            return Err(CatalogError::Status {
                status: 500,
                operation: "create image",
                body: "internal error".to_string(),
            });
        }

        let mut cert_image = input.cert_image.clone();
        cert_image.id = "img-1".to_string();
        Ok(CertificationResults {
            cert_image,
            test_results: Some(input.test_results.clone()),
            rpm_manifest: Some(input.rpm_manifest.clone()),
            artifacts: input.artifacts.clone(),
        })
    }

    fn find_images_by_digest(&self, _ctx: &RunContext, _digests: &[String]) -> Result<Vec<CertImage>, CatalogError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}
