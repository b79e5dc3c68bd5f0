//! Policy resolution integration tests.
//!
//! Exception metadata comes from the in-process catalog.

use crate::mocks::{full_registry, FakeCatalogClient, Verdict};
use cert_preflight::engine::RunContext;
use cert_preflight::policy::{Policy, PolicyError, PolicyResolver};

fn resolve(client: &FakeCatalogClient, explicit: Option<Policy>) -> Result<Policy, PolicyError> {
    let ctx = RunContext::in_memory();
    PolicyResolver::new().resolve_from_catalog(&ctx, explicit, Some(client))
}

#[test]
fn test_scratch_project_resolves_to_scratch() {
    let client = FakeCatalogClient::with_project(true, false);
    assert_eq!(resolve(&client, None).unwrap(), Policy::Scratch);
    assert_eq!(client.get_project_calls(), 1);
}

#[test]
fn test_privileged_project_resolves_to_root() {
    let client = FakeCatalogClient::with_project(false, true);
    assert_eq!(resolve(&client, None).unwrap(), Policy::Root);
}

#[test]
fn test_scratch_and_privileged_resolves_to_scratch() {
    let client = FakeCatalogClient::with_project(true, true);
    for _ in 0..5 {
        assert_eq!(resolve(&client, None).unwrap(), Policy::Scratch);
    }
}

#[test]
fn test_plain_project_resolves_to_container() {
    let client = FakeCatalogClient::with_project(false, false);
    assert_eq!(resolve(&client, None).unwrap(), Policy::Container);
}

#[test]
fn test_explicit_policy_skips_catalog() {
    let client = FakeCatalogClient::with_project(true, true);
    assert_eq!(resolve(&client, Some(Policy::Operator)).unwrap(), Policy::Operator);
    assert_eq!(client.total_calls(), 0);
}

#[test]
fn test_no_catalog_resolves_to_container() {
    let ctx = RunContext::in_memory();
    let policy = PolicyResolver::new().resolve_from_catalog(&ctx, None, None).unwrap();
    assert_eq!(policy, Policy::Container);
}

#[test]
fn test_catalog_failures_are_reported() {
    let err = resolve(&FakeCatalogClient::unreachable(), None).unwrap_err();
    assert!(matches!(err, PolicyError::Resolution(_)));

    let err = resolve(&FakeCatalogClient::without_project(), None).unwrap_err();
    assert!(matches!(err, PolicyError::EmptyProject));
}

#[test]
fn test_registry_supplies_every_policy() {
    let registry = full_registry(|_| Verdict::Pass);
    for policy in Policy::ALL {
        let checks = registry.checks_for(policy).unwrap();
        let names: Vec<&str> = checks.iter().map(|c| c.name()).collect();
        assert_eq!(names, policy.check_names());
    }
}
