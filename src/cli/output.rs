//! Report rendering.
//!
//! Provides JSON, JUnit XML, and terminal formatters over [`Results`].
//!
//! - JSON is the canonical report: it is written to `results.json` and read
//!   back by the catalog submitter
//! - JUnit XML is written to `results-junit.xml` when enabled (requires the
//!   `junit` feature)
//! - Text is a human summary for the terminal
//!
//! Every formatter produces valid output for any [`Results`], including a
//! run with zero checks.

use crate::engine::report::UserResponse;
use crate::engine::result::Results;
use crate::version::LibraryInfo;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const RULE: &str = "--------------------------------------------------------------------------------";

/// Errors while rendering a report.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("could not serialize report")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown output format '{0}'. Valid formats: json, junit, text")]
    UnknownFormat(String),

    #[error("JUnit output requires the 'junit' feature")]
    JunitUnavailable,
}

/// Selectable report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Junit,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Junit => write!(f, "junit"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "junit" | "xml" => Ok(OutputFormat::Junit),
            "text" | "terminal" => Ok(OutputFormat::Text),
            other => Err(FormatError::UnknownFormat(other.to_string())),
        }
    }
}

/// Renders [`Results`] into bytes.
pub trait ResponseFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extension of files written in this format, without the dot.
    fn file_extension(&self) -> &'static str;

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatError>;
}

/// Serializes the report document.
pub struct JsonFormatter {
    pretty: bool,
    library: LibraryInfo,
}

impl JsonFormatter {
    pub fn new(pretty: bool, library: LibraryInfo) -> Self {
        JsonFormatter { pretty, library }
    }
}

impl ResponseFormatter for JsonFormatter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatError> {
        let response = UserResponse::from_results(results, self.library.clone());
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(&response)?
        } else {
            serde_json::to_vec(&response)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// JUnit XML, one test case per executed check.
#[cfg(feature = "junit")]
pub struct JunitFormatter {
    library: LibraryInfo,
}

#[cfg(feature = "junit")]
impl JunitFormatter {
    pub fn new(library: LibraryInfo) -> Self {
        JunitFormatter { library }
    }

    fn escape_xml(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&apos;"),
                c if c.is_control() && c != '\n' && c != '\t' => {}
                c => out.push(c),
            }
        }
        out
    }

    fn testcase(&self, out: &mut String, name: &str, seconds: f64) {
        out.push_str(&format!(
            "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
            Self::escape_xml(name),
            Self::escape_xml(&self.library.name),
            seconds
        ));
    }
}

#[cfg(feature = "junit")]
impl ResponseFormatter for JunitFormatter {
    fn name(&self) -> &'static str {
        "junit"
    }

    fn file_extension(&self) -> &'static str {
        "xml"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatError> {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let time = results.total_elapsed().as_secs_f64();
        out.push_str(&format!(
            "<testsuites tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            results.total(),
            results.failed.len(),
            results.errors.len(),
            time
        ));
        out.push_str(&format!(
            "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            Self::escape_xml(&results.tested_image),
            results.total(),
            results.failed.len(),
            results.errors.len(),
            time
        ));
        out.push_str("    <properties>\n");
        out.push_str(&format!(
            "      <property name=\"{}.version\" value=\"{}\"></property>\n",
            Self::escape_xml(&self.library.name),
            Self::escape_xml(&self.library.version)
        ));
        out.push_str(&format!(
            "      <property name=\"{}.commit\" value=\"{}\"></property>\n",
            Self::escape_xml(&self.library.name),
            Self::escape_xml(&self.library.commit)
        ));
        out.push_str("    </properties>\n");

        for passed in &results.passed {
            self.testcase(&mut out, passed.name(), passed.elapsed.as_secs_f64());
            out.push_str("></testcase>\n");
        }

        for failed in &results.failed {
            let help = failed.check.help();
            let metadata = failed.check.metadata();
            self.testcase(&mut out, failed.name(), failed.elapsed.as_secs_f64());
            out.push_str(">\n");
            out.push_str(&format!(
                "      <failure message=\"{}\" type=\"\">Suggestion: {}\n\nDocumentation: {}</failure>\n",
                Self::escape_xml(&help.message),
                Self::escape_xml(&help.suggestion),
                Self::escape_xml(metadata.knowledge_base_url.as_deref().unwrap_or(""))
            ));
            out.push_str("    </testcase>\n");
        }

        for errored in &results.errors {
            self.testcase(&mut out, errored.name(), errored.elapsed.as_secs_f64());
            out.push_str(">\n");
            out.push_str(&format!(
                "      <error message=\"{}\" type=\"\"></error>\n",
                Self::escape_xml(&errored.error.to_string())
            ));
            out.push_str("    </testcase>\n");
        }

        out.push_str("  </testsuite>\n");
        out.push_str("</testsuites>\n");
        Ok(out.into_bytes())
    }
}

/// Terminal summary.
pub struct TextFormatter {
    color: bool,
}

impl TextFormatter {
    pub fn new(color: bool) -> Self {
        TextFormatter { color }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

impl ResponseFormatter for TextFormatter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn format(&self, results: &Results) -> Result<Vec<u8>, FormatError> {
        let mut out = String::new();
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!("Image: {}\n", results.tested_image));
        out.push_str(&format!("Tested on: {}\n", results.tested_on));
        if let Some(ref hash) = results.certification_hash {
            out.push_str(&format!("Certification hash: {}\n", hash));
        }
        out.push_str(RULE);
        out.push_str("\n\n");

        for r in &results.passed {
            out.push_str(&format!("  {} {} ({}ms)\n", self.paint("[PASS]", "32"), r.name(), r.elapsed.as_millis()));
        }
        for r in &results.failed {
            out.push_str(&format!("  {} {} ({}ms)\n", self.paint("[FAIL]", "31"), r.name(), r.elapsed.as_millis()));
            let help = r.check.help();
            if !help.suggestion.is_empty() {
                out.push_str(&format!("         Suggestion: {}\n", help.suggestion));
            }
        }
        for e in &results.errors {
            out.push_str(&format!("  {} {} ({}ms)\n", self.paint("[ERROR]", "33"), e.name(), e.elapsed.as_millis()));
            out.push_str(&format!("         {}\n", e.error));
        }

        out.push('\n');
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!(
            "SUMMARY: {} passed, {} failed, {} errored\n",
            results.passed.len(),
            results.failed.len(),
            results.errors.len()
        ));
        let verdict = if results.passed_overall() {
            self.paint("PASSED", "32")
        } else {
            self.paint("FAILED", "31")
        };
        out.push_str(&format!("Result: {}\n", verdict));
        out.push_str(RULE);
        out.push('\n');
        Ok(out.into_bytes())
    }
}

/// Formatter for `format`.
pub fn formatter_for(
    format: OutputFormat,
    library: LibraryInfo,
    color: bool,
) -> Result<Box<dyn ResponseFormatter>, FormatError> {
    match format {
        OutputFormat::Json => Ok(Box::new(JsonFormatter::new(true, library))),
        #[cfg(feature = "junit")]
        OutputFormat::Junit => Ok(Box::new(JunitFormatter::new(library))),
        #[cfg(not(feature = "junit"))]
        OutputFormat::Junit => Err(FormatError::JunitUnavailable),
        OutputFormat::Text => Ok(Box::new(TextFormatter::new(color))),
    }
}
