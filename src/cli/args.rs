//! Argument parser for cert-preflight.
//!
//! Flags override values taken from the environment. Catalog settings come
//! from `PFLT_*` variables via [`PreflightConfig::from_env`] and are then
//! overridden here by [`Args::apply_to`].

use crate::logging::DEFAULT_LOG_LEVEL;
use crate::policy::Policy;
use crate::PreflightConfig;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;

/// Command to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Print usage (default)
    #[default]
    Help,
    /// List policies and their checks
    List,
    /// Submit an existing artifacts directory to the catalog
    Submit,
    /// Print version information
    Version,
}

/// Parsed command line arguments
#[derive(Debug, Clone)]
pub struct Args {
    pub command: Command,
    pub policy: Option<Policy>,
    pub artifacts: Option<PathBuf>,
    pub certification_project_id: Option<String>,
    pub pyxis_api_token: Option<SecretString>,
    pub pyxis_host: Option<String>,
    pub pyxis_env: Option<String>,
    pub docker_config: Option<PathBuf>,
    pub log_level: String,
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            command: Command::default(),
            policy: None,
            artifacts: None,
            certification_project_id: None,
            pyxis_api_token: None,
            pyxis_host: None,
            pyxis_env: None,
            docker_config: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            help: false,
        }
    }
}

/// Flags that take a value.
const VALUE_FLAGS: &[&str] = &[
    "--policy",
    "--artifacts",
    "--certification-project-id",
    "--pyxis-api-token",
    "--pyxis-host",
    "--pyxis-env",
    "--docker-config",
    "--log-level",
];

impl Args {
    /// Parse `std::env::args()`.
    pub fn parse() -> Result<Self, String> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_with_env(&args, |key| env::var(key).ok())
    }

    /// Parse from a slice, reading nothing from the environment.
    pub fn parse_from(args: &[String]) -> Result<Self, String> {
        Self::parse_with_env(args, |_| None)
    }

    /// Parse from a slice with an explicit environment lookup.
    pub fn parse_with_env<F>(args: &[String], lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = Args::default();

        if let Some(level) = lookup("PFLT_LOGLEVEL").filter(|l| !l.trim().is_empty()) {
            result.log_level = level;
        }

        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();

            // --flag=value and --flag value are equivalent
            let (flag, inline) = match arg.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
                _ => (arg, None),
            };

            if VALUE_FLAGS.contains(&flag) {
                let value = match inline {
                    Some(v) => v,
                    None => {
                        i += 1;
                        args.get(i)
                            .cloned()
                            .ok_or_else(|| format!("{} requires a value", flag))?
                    }
                };
                result.set_value(flag, value)?;
                i += 1;
                continue;
            }

            match arg {
                "list" => result.command = Command::List,
                "submit" => result.command = Command::Submit,
                "version" => result.command = Command::Version,
                "help" | "-h" | "--help" => result.help = true,
                "-V" | "--version" => result.command = Command::Version,
                _ if arg.starts_with('-') => return Err(format!("Unknown option: '{}'", arg)),
                _ => return Err(format!("Unexpected argument: '{}'", arg)),
            }
            i += 1;
        }

        Ok(result)
    }

    fn set_value(&mut self, flag: &str, value: String) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err(format!("{} requires a non-empty value", flag));
        }
        match flag {
            "--policy" => self.policy = Some(value.parse().map_err(|e| format!("{}", e))?),
            "--artifacts" => self.artifacts = Some(PathBuf::from(value)),
            "--certification-project-id" => self.certification_project_id = Some(value),
            "--pyxis-api-token" => self.pyxis_api_token = Some(SecretString::from(value)),
            "--pyxis-host" => self.pyxis_host = Some(value),
            "--pyxis-env" => self.pyxis_env = Some(value),
            "--docker-config" => self.docker_config = Some(PathBuf::from(value)),
            "--log-level" => self.log_level = value,
            _ => return Err(format!("Unknown option: '{}'", flag)),
        }
        Ok(())
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut PreflightConfig) {
        if let Some(policy) = self.policy {
            config.policy = Some(policy);
        }
        if let Some(ref dir) = self.artifacts {
            config.artifacts_dir = dir.clone();
        }
        if let Some(ref id) = self.certification_project_id {
            config.set_certification_project_id(id);
        }
        if let Some(ref token) = self.pyxis_api_token {
            config.api_token = Some(token.clone());
        }
        if let Some(ref host) = self.pyxis_host {
            config.catalog_host = Some(host.clone());
        }
        if let Some(ref env) = self.pyxis_env {
            config.catalog_env = env.clone();
        }
        if let Some(ref path) = self.docker_config {
            config.docker_config = Some(path.clone());
        }
        config.log_level = self.log_level.clone();
    }
}
