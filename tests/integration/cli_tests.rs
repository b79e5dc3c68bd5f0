//! CLI integration tests.
//!
//! Tests for argument parsing and how flags layer over the environment.

use cert_preflight::cli::args::{Args, Command};
use cert_preflight::policy::Policy;
use cert_preflight::PreflightConfig;
use secrecy::ExposeSecret;
use std::path::PathBuf;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_default_args() {
    let parsed = Args::parse_from(&[]).unwrap();
    assert_eq!(parsed.command, Command::Help);
    assert!(!parsed.help);
}

#[test]
fn test_version_command() {
    assert_eq!(Args::parse_from(&args(&["version"])).unwrap().command, Command::Version);
    assert_eq!(Args::parse_from(&args(&["--version"])).unwrap().command, Command::Version);
}

#[test]
fn test_list_command_with_policy() {
    let parsed = Args::parse_from(&args(&["list", "--policy", "root"])).unwrap();
    assert_eq!(parsed.command, Command::List);
    assert_eq!(parsed.policy, Some(Policy::Root));
}

#[test]
fn test_report_rendering_flags_are_rejected() {
    assert!(Args::parse_from(&args(&["list", "--format=text"])).is_err());
    assert!(Args::parse_from(&args(&["submit", "--no-color"])).is_err());
}

#[test]
fn test_flags_override_environment() {
    let env = |key: &str| match key {
        "PFLT_ARTIFACTS" => Some("/from/env".to_string()),
        "PFLT_CERTIFICATION_PROJECT_ID" => Some("env-project".to_string()),
        "PFLT_PYXIS_API_TOKEN" => Some("env-token".to_string()),
        "PFLT_PYXIS_ENV" => Some("qa".to_string()),
        _ => None,
    };
    let mut config = PreflightConfig::from_lookup(env);

    let parsed = Args::parse_from(&args(&[
        "submit",
        "--artifacts",
        "/from/flag",
        "--certification-project-id",
        "ospid-flag-project",
    ]))
    .unwrap();
    parsed.apply_to(&mut config);

    assert_eq!(config.artifacts_dir, PathBuf::from("/from/flag"));
    assert_eq!(config.certification_project_id.as_deref(), Some("flag-project"));
    assert_eq!(config.api_token.as_ref().unwrap().expose_secret(), "env-token");
    assert_eq!(config.catalog_env, "qa");

    let catalog = config.catalog_config().unwrap();
    assert_eq!(catalog.project_id, "flag-project");
    assert_eq!(catalog.resolved_host(), "catalog.qa.redhat.com/api/containers");
}

#[test]
fn test_submit_without_token_has_no_catalog_config() {
    let mut config = PreflightConfig::default();
    Args::parse_from(&args(&["submit", "--certification-project-id", "42"]))
        .unwrap()
        .apply_to(&mut config);
    assert!(config.catalog_config().is_none());
}

#[test]
fn test_unknown_arguments_are_rejected() {
    assert!(Args::parse_from(&args(&["--parallel"])).is_err());
    assert!(Args::parse_from(&args(&["check"])).is_err());
    assert!(Args::parse_from(&args(&["list", "--policy"])).is_err());
}
