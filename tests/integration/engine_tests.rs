//! Check engine integration tests.
//!
//! Outcome partitioning, overall verdict, and fatal conditions.

use crate::mocks::{as_checks, StubCheck};
use cert_preflight::engine::{CancellationToken, CheckEngine, EngineError, PolicyEngine, RunContext};

const IMAGE: &str = "quay.io/example/app:1.0";

#[test]
fn test_two_pass_one_fail() {
    let ctx = RunContext::in_memory();
    let stubs = vec![
        StubCheck::passing("HasLicense"),
        StubCheck::failing("RunAsNonRoot"),
        StubCheck::passing("HasUniqueTag"),
    ];
    let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));

    engine.execute_checks(&ctx).unwrap();
    let results = engine.results(&ctx).unwrap();

    assert_eq!(results.passed.len(), 2);
    assert_eq!(results.failed.len(), 1);
    assert_eq!(results.errors.len(), 0);
    assert!(!results.passed_overall());
    assert_eq!(results.failed[0].name(), "RunAsNonRoot");
}

#[test]
fn test_every_check_lands_in_exactly_one_bucket() {
    let ctx = RunContext::in_memory();
    let stubs = vec![
        StubCheck::passing("A"),
        StubCheck::erroring("B"),
        StubCheck::failing("C"),
        StubCheck::passing("D"),
        StubCheck::erroring("E"),
    ];
    let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));
    engine.execute_checks(&ctx).unwrap();
    let results = engine.results(&ctx).unwrap();

    assert_eq!(results.total(), stubs.len());
    for stub in &stubs {
        assert_eq!(stub.calls(), 1);
    }

    let mut names: Vec<&str> = results
        .passed
        .iter()
        .map(|r| r.name())
        .chain(results.failed.iter().map(|r| r.name()))
        .chain(results.errors.iter().map(|e| e.name()))
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
}

#[test]
fn test_buckets_keep_execution_order() {
    let ctx = RunContext::in_memory();
    let stubs = vec![
        StubCheck::passing("Zeta"),
        StubCheck::passing("Alpha"),
        StubCheck::passing("Mid"),
    ];
    let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));
    engine.execute_checks(&ctx).unwrap();
    let results = engine.results(&ctx).unwrap();

    let order: Vec<&str> = results.passed.iter().map(|r| r.name()).collect();
    assert_eq!(order, vec!["Zeta", "Alpha", "Mid"]);
}

#[test]
fn test_erroring_check_does_not_abort_run() {
    let ctx = RunContext::in_memory();
    let stubs = vec![StubCheck::erroring("BasedOnUbi"), StubCheck::passing("HasLicense")];
    let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));

    assert!(engine.execute_checks(&ctx).is_ok());
    let results = engine.results(&ctx).unwrap();

    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].name(), "BasedOnUbi");
    assert!(results.errors[0].error.to_string().contains("could not inspect"));
    assert_eq!(results.passed.len(), 1);
    assert!(!results.passed_overall());
}

#[test]
fn test_zero_checks_pass() {
    let ctx = RunContext::in_memory();
    let mut engine = PolicyEngine::new(IMAGE, Vec::new());

    engine.execute_checks(&ctx).unwrap();
    let results = engine.results(&ctx).unwrap();

    assert_eq!(results.total(), 0);
    assert!(results.passed_overall());
    assert!(results.certification_hash.is_some());
}

#[test]
fn test_passed_overall_matches_buckets() {
    let ctx = RunContext::in_memory();
    let cases = vec![
        (vec![StubCheck::passing("A")], true),
        (vec![StubCheck::passing("A"), StubCheck::failing("B")], false),
        (vec![StubCheck::erroring("A")], false),
    ];

    for (stubs, expected) in cases {
        let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));
        engine.execute_checks(&ctx).unwrap();
        let results = engine.results(&ctx).unwrap();
        assert_eq!(results.passed_overall(), expected);
        assert_eq!(
            results.passed_overall(),
            results.failed.is_empty() && results.errors.is_empty()
        );
    }
}

#[test]
fn test_invalid_target_runs_nothing() {
    let ctx = RunContext::in_memory();
    let stubs = vec![StubCheck::passing("HasLicense")];
    let mut engine = PolicyEngine::new("quay.io/Example/UPPER:1.0", as_checks(&stubs));

    let err = engine.execute_checks(&ctx).unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
    assert_eq!(stubs[0].calls(), 0);
    assert!(engine.results(&ctx).is_none());
}

#[test]
fn test_cancelled_run_produces_no_results() {
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::in_memory().with_cancellation(token);
    let stubs = vec![StubCheck::passing("A"), StubCheck::passing("B")];
    let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));

    let err = engine.execute_checks(&ctx).unwrap_err();
    assert!(matches!(err, EngineError::Cancelled { completed: 0, total: 2 }));
    assert!(engine.results(&ctx).is_none());
    assert_eq!(stubs[0].calls(), 0);
}

#[test]
fn test_certification_hash_is_stable_across_runs() {
    let ctx = RunContext::in_memory();
    let run = || {
        let stubs = vec![StubCheck::passing("A"), StubCheck::failing("B")];
        let mut engine = PolicyEngine::new(IMAGE, as_checks(&stubs));
        engine.execute_checks(&ctx).unwrap();
        engine.results(&ctx).unwrap().certification_hash
    };

    let first = run();
    assert!(first.is_some());
    assert_eq!(first, run());
}
