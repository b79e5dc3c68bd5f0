//! Version and build information.
//!
//! Provides version, git commit, and build metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: Option<&'static str>,
    pub build_date: Option<&'static str>,
    pub target: &'static str,
    pub rustc_version: Option<&'static str>,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cert-preflight {}", self.version)?;

        if let Some(commit) = self.commit {
            writeln!(f, "Commit: {}", commit)?;
        }

        if let Some(date) = self.build_date {
            writeln!(f, "Built: {}", date)?;
        }

        writeln!(f, "Target: {}", self.target)?;

        if let Some(rustc) = self.rustc_version {
            write!(f, "Rustc: {}", rustc)?;
        }

        Ok(())
    }
}

/// Library identity embedded in every rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub commit: String,
}

impl BuildInfo {
    pub fn library_info(&self) -> LibraryInfo {
        LibraryInfo {
            name: "cert-preflight".to_string(),
            version: self.version.to_string(),
            commit: self.commit.unwrap_or("unknown").to_string(),
        }
    }
}

/// Get build information
pub fn get_build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("PREFLIGHT_GIT_HASH"),
        build_date: option_env!("PREFLIGHT_BUILD_DATE"),
        target: std::env::consts::ARCH,
        rustc_version: option_env!("PREFLIGHT_RUSTC_VERSION"),
    }
}
