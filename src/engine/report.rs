//! Serialized form of [`Results`].
//!
//! This is the document written to `results.json` and embedded in catalog
//! submissions, so its field names are a stable contract.

use super::result::{CheckResult, ErroredCheck, Results};
use crate::version::LibraryInfo;
use serde::{Deserialize, Serialize};

/// Top-level report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub image: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_hash: Option<String>,
    pub test_library: LibraryInfo,
    pub results: ResultsReport,
}

/// Per-bucket check entries, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    #[serde(default)]
    pub passed: Vec<CheckExecutionInfo>,
    #[serde(default)]
    pub failed: Vec<CheckExecutionInfo>,
    #[serde(default)]
    pub errors: Vec<CheckExecutionInfo>,
}

/// One executed check. Remediation fields are only filled for checks that
/// did not pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckExecutionInfo {
    pub name: String,
    /// Milliseconds
    pub elapsed_time: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub knowledgebase_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub check_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckExecutionInfo {
    fn passed(result: &CheckResult) -> Self {
        CheckExecutionInfo {
            name: result.name().to_string(),
            elapsed_time: result.elapsed.as_secs_f64() * 1000.0,
            description: result.check.metadata().description,
            ..Default::default()
        }
    }

    fn failed(result: &CheckResult) -> Self {
        let metadata = result.check.metadata();
        let help = result.check.help();
        CheckExecutionInfo {
            name: result.name().to_string(),
            elapsed_time: result.elapsed.as_secs_f64() * 1000.0,
            description: metadata.description,
            help: help.message,
            suggestion: help.suggestion,
            knowledgebase_url: metadata.knowledge_base_url.unwrap_or_default(),
            check_url: metadata.check_url.unwrap_or_default(),
            error: None,
        }
    }

    fn errored(errored: &ErroredCheck) -> Self {
        let mut info = Self::failed(&CheckResult {
            check: errored.check.clone(),
            elapsed: errored.elapsed,
        });
        info.error = Some(errored.error.to_string());
        info
    }
}

impl UserResponse {
    pub fn from_results(results: &Results, test_library: LibraryInfo) -> Self {
        UserResponse {
            image: results.tested_image.clone(),
            passed: results.passed_overall(),
            certification_hash: results.certification_hash.clone(),
            test_library,
            results: ResultsReport {
                passed: results.passed.iter().map(CheckExecutionInfo::passed).collect(),
                failed: results.failed.iter().map(CheckExecutionInfo::failed).collect(),
                errors: results.errors.iter().map(CheckExecutionInfo::errored).collect(),
            },
        }
    }

    /// Whether the embedded buckets agree with the `passed` flag.
    pub fn is_consistent(&self) -> bool {
        self.passed == (self.results.failed.is_empty() && self.results.errors.is_empty())
    }
}
