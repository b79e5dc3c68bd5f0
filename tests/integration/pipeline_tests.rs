//! Full pipeline integration tests.
//!
//! Policy resolution, check execution, artifact writing, and submission
//! through [`Preflight::run`].

use crate::mocks::{full_registry, FakeCatalogClient, Verdict};
use cert_preflight::artifacts::{
    ArtifactStore, ArtifactWriter, FsArtifactStore, MapArtifactStore, CERT_IMAGE_FILENAME, JUNIT_RESULTS_FILENAME,
    LOG_FILENAME, RPM_MANIFEST_FILENAME, TEST_RESULTS_FILENAME,
};
use cert_preflight::cli::output::OutputFormat;
use cert_preflight::engine::{RunContext, UserResponse};
use cert_preflight::logging::{capture_scoped, ExecutionLog};
use cert_preflight::policy::{Policy, PolicyError};
use cert_preflight::submit::{SubmissionOutcome, SubmitError};
use cert_preflight::{Preflight, PreflightConfig, PreflightError};
use std::sync::Arc;
use tracing::Level;

const IMAGE: &str = "quay.io/example/app:1.0";

fn config(policy: Option<Policy>) -> PreflightConfig {
    let mut config = PreflightConfig::for_image(IMAGE);
    config.policy = policy;
    config
}

#[test]
fn test_run_writes_results_and_log() {
    let store = Arc::new(MapArtifactStore::new());
    let log = ExecutionLog::new();
    let ctx = RunContext::new(store.clone()).with_log(log.clone());
    let registry = full_registry(|name| if name == "RunAsNonRoot" { Verdict::Fail } else { Verdict::Pass });

    let report = {
        let _guard = capture_scoped(&log, Level::INFO);
        Preflight::new(config(Some(Policy::Container)), registry).run(&ctx).unwrap()
    };

    assert_eq!(report.policy, Policy::Container);
    assert_eq!(report.results.passed.len(), Policy::Container.check_names().len() - 1);
    assert_eq!(report.results.failed.len(), 1);
    assert!(!report.passed());
    assert_eq!(report.artifacts.len(), 2);

    let files = store.files();
    let response: UserResponse = serde_json::from_slice(&files[TEST_RESULTS_FILENAME]).unwrap();
    assert!(!response.passed);
    assert_eq!(response.results.failed[0].name, "RunAsNonRoot");
    assert!(!files.contains_key(JUNIT_RESULTS_FILENAME));

    let persisted_log = String::from_utf8(files[LOG_FILENAME].clone()).unwrap();
    assert!(persisted_log.contains("check failed"));
    assert!(persisted_log.contains("RunAsNonRoot"));

    assert_eq!(report.submission.unwrap(), SubmissionOutcome::Skipped { reason: None });
}

#[test]
fn test_run_fills_log_without_caller_logging() {
    let store = Arc::new(MapArtifactStore::new());
    let ctx = RunContext::new(store.clone());

    let report = Preflight::new(config(Some(Policy::Scratch)), full_registry(|_| Verdict::Fail))
        .run(&ctx)
        .unwrap();

    assert_eq!(report.results.failed.len(), Policy::Scratch.check_names().len());
    let persisted_log = String::from_utf8(store.read_file(LOG_FILENAME).unwrap()).unwrap();
    assert!(!persisted_log.is_empty());
    assert!(persisted_log.contains("starting preflight run"));
    for name in Policy::Scratch.check_names() {
        assert!(persisted_log.contains(name), "{} missing from log", name);
    }
}

#[cfg(feature = "junit")]
#[test]
fn test_run_writes_junit_when_enabled() {
    let store = Arc::new(MapArtifactStore::new());
    let ctx = RunContext::new(store.clone());
    let mut config = config(Some(Policy::Scratch));
    config.write_junit = true;

    let report = Preflight::new(config, full_registry(|_| Verdict::Pass)).run(&ctx).unwrap();

    assert!(report.passed());
    let xml = String::from_utf8(store.read_file(JUNIT_RESULTS_FILENAME).unwrap()).unwrap();
    assert!(xml.contains(&format!("tests=\"{}\"", Policy::Scratch.check_names().len())));
}

#[test]
fn test_render_uses_configured_format() {
    let ctx = RunContext::in_memory();
    let mut config = config(Some(Policy::Scratch));
    config.format = OutputFormat::Text;
    let preflight = Preflight::new(config, full_registry(|_| Verdict::Pass));

    let report = preflight.run(&ctx).unwrap();
    let text = String::from_utf8(preflight.render(&report.results, false).unwrap()).unwrap();

    assert!(text.contains("Result: PASSED"));
    assert!(text.contains("[PASS] HasLicense"));
}

#[test]
fn test_policy_resolved_from_catalog() {
    let ctx = RunContext::in_memory();
    let client = Arc::new(FakeCatalogClient::with_project(true, true));

    let report = Preflight::new(config(None), full_registry(|_| Verdict::Pass))
        .with_catalog(client.clone())
        .run(&ctx)
        .unwrap();

    assert_eq!(report.policy, Policy::Scratch);
    assert_eq!(report.results.total(), Policy::Scratch.check_names().len());
    assert_eq!(client.get_project_calls(), 1);
}

#[test]
fn test_unregistered_policy_check_is_fatal() {
    let ctx = RunContext::in_memory();
    let err = Preflight::new(config(Some(Policy::Operator)), Default::default())
        .run(&ctx)
        .unwrap_err();

    assert!(matches!(err, PreflightError::Policy(PolicyError::UnknownCheck { .. })));
    assert!(ctx.artifacts().names().is_empty());
}

#[test]
fn test_run_and_submit() {
    let store = Arc::new(MapArtifactStore::new());
    store
        .write_bytes(CERT_IMAGE_FILENAME, br#"{"docker_image_digest": "sha256:aaaa"}"#)
        .unwrap();
    store.write_bytes(RPM_MANIFEST_FILENAME, br#"{"rpms": []}"#).unwrap();
    let ctx = RunContext::new(store);
    let client = Arc::new(FakeCatalogClient::with_project(false, false));

    let mut config = config(Some(Policy::Container));
    config.submit = true;
    config.certification_project_id = Some("p-100".to_string());

    let report = Preflight::new(config, full_registry(|_| Verdict::Pass))
        .with_catalog(client.clone())
        .run(&ctx)
        .unwrap();

    assert!(report.passed());
    let SubmissionOutcome::Submitted(receipt) = report.submission.unwrap() else {
        panic!("expected a submission");
    };
    assert_eq!(receipt.project_id, "p-100");
    assert_eq!(client.submit_calls(), 1);

    let input = client.last_input().unwrap();
    assert!(input.test_results.response.passed);
    assert_eq!(input.artifacts[0].filename, LOG_FILENAME);
}

#[test]
fn test_submission_failure_keeps_local_results() {
    let store = Arc::new(MapArtifactStore::new());
    let ctx = RunContext::new(store.clone());
    let client = Arc::new(FakeCatalogClient::with_project(false, false));

    let mut config = config(Some(Policy::Container));
    config.submit = true;

    let report = Preflight::new(config, full_registry(|_| Verdict::Pass))
        .with_catalog(client.clone())
        .run(&ctx)
        .unwrap();

    assert!(report.passed());
    assert!(matches!(report.submission, Err(SubmitError::MissingArtifact { .. })));
    assert!(store.exists(TEST_RESULTS_FILENAME));
    assert!(store.exists(LOG_FILENAME));
    assert_eq!(client.total_calls(), 0);
}

#[test]
fn test_fs_store_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    let first = store.write_bytes(TEST_RESULTS_FILENAME, b"first run").unwrap();
    let second = store.write_bytes(TEST_RESULTS_FILENAME, b"second").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join(TEST_RESULTS_FILENAME));
    assert_eq!(store.read_file(TEST_RESULTS_FILENAME).unwrap(), b"second");
    assert_eq!(store.names(), vec![TEST_RESULTS_FILENAME.to_string()]);
}

#[test]
fn test_fs_store_backs_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::new(Arc::new(FsArtifactStore::new(dir.path())));

    let report = Preflight::new(config(Some(Policy::Root)), full_registry(|_| Verdict::Pass))
        .run(&ctx)
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.policy, Policy::Root);
    for path in &report.artifacts {
        assert!(path.starts_with(dir.path()));
        assert!(path.is_file());
    }
    assert!(dir.path().join(TEST_RESULTS_FILENAME).is_file());
}
