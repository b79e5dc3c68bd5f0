//! Report rendering integration tests.

use crate::mocks::{as_checks, StubCheck};
use cert_preflight::cli::output::{formatter_for, JsonFormatter, OutputFormat, ResponseFormatter, TextFormatter};
use cert_preflight::engine::{CheckEngine, PolicyEngine, Results, RunContext, UserResponse};
use cert_preflight::version::get_build_info;
use cert_preflight::LibraryInfo;

fn library() -> LibraryInfo {
    get_build_info().library_info()
}

fn mixed_results() -> Results {
    let ctx = RunContext::in_memory();
    let stubs = vec![
        StubCheck::passing("HasLicense"),
        StubCheck::failing("RunAsNonRoot"),
        StubCheck::erroring("BasedOnUbi"),
    ];
    let mut engine = PolicyEngine::new("quay.io/example/app:1.0", as_checks(&stubs));
    engine.execute_checks(&ctx).unwrap();
    engine.results(&ctx).unwrap()
}

#[test]
fn test_json_report_fields() {
    let bytes = JsonFormatter::new(true, library()).format(&mixed_results()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["image"], "quay.io/example/app:1.0");
    assert_eq!(value["passed"], false);
    assert_eq!(value["test_library"]["name"], "cert-preflight");

    let passed = &value["results"]["passed"][0];
    assert_eq!(passed["name"], "HasLicense");
    assert_eq!(passed["description"], "Verifies HasLicense");
    assert!(passed.get("suggestion").is_none());

    let failed = &value["results"]["failed"][0];
    assert_eq!(failed["name"], "RunAsNonRoot");
    assert_eq!(failed["suggestion"], "Fix whatever RunAsNonRoot complains about.");
    assert_eq!(failed["knowledgebase_url"], "https://kb.example.com/RunAsNonRoot");
    assert_eq!(failed["check_url"], "https://docs.example.com/checks/RunAsNonRoot");

    let errored = &value["results"]["errors"][0];
    assert_eq!(errored["name"], "BasedOnUbi");
    assert!(errored["error"].as_str().unwrap().contains("could not inspect"));
}

#[test]
fn test_json_report_reads_back_consistently() {
    let bytes = JsonFormatter::new(false, library()).format(&mixed_results()).unwrap();
    let response: UserResponse = serde_json::from_slice(&bytes).unwrap();

    assert!(response.is_consistent());
    assert_eq!(response.results.passed.len(), 1);
    assert_eq!(response.results.failed.len(), 1);
    assert_eq!(response.results.errors.len(), 1);
}

#[test]
fn test_text_summary_counts() {
    let text = String::from_utf8(TextFormatter::new(false).format(&mixed_results()).unwrap()).unwrap();

    assert!(text.contains("[PASS] HasLicense"));
    assert!(text.contains("[FAIL] RunAsNonRoot"));
    assert!(text.contains("[ERROR] BasedOnUbi"));
    assert!(text.contains("SUMMARY: 1 passed, 1 failed, 1 errored"));
    assert!(text.contains("Result: FAILED"));
}

#[cfg(feature = "junit")]
#[test]
fn test_junit_counts_and_messages() {
    let formatter = formatter_for(OutputFormat::Junit, library(), false).unwrap();
    let xml = String::from_utf8(formatter.format(&mixed_results()).unwrap()).unwrap();

    assert_eq!(formatter.file_extension(), "xml");
    assert!(xml.contains("<testsuites tests=\"3\" failures=\"1\" errors=\"1\""));
    assert!(xml.contains("<testcase name=\"HasLicense\""));
    assert!(xml.contains("<failure message=\"Check RunAsNonRoot encountered an error.\""));
    assert!(xml.contains("<error message=\"BasedOnUbi could not inspect the image\""));
}

#[test]
fn test_formatter_selection() {
    for format in [OutputFormat::Json, OutputFormat::Text] {
        let formatter = formatter_for(format, library(), false).unwrap();
        assert_eq!(formatter.name(), format.to_string());
    }
}
