//! cert-preflight CLI entry point
//!
//! Lists certification policies and submits the evidence of a completed run
//! to the certification catalog.

use cert_preflight::artifacts::FsArtifactStore;
use cert_preflight::catalog::HttpCatalogClient;
use cert_preflight::checks::CheckRegistry;
use cert_preflight::cli::args::{Args, Command};
use cert_preflight::engine::RunContext;
use cert_preflight::logging::{self, ExecutionLog};
use cert_preflight::policy::Policy;
use cert_preflight::submit::SubmissionOutcome;
use cert_preflight::version::get_build_info;
use cert_preflight::{Preflight, PreflightConfig};

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'cert-preflight --help' for usage information.");
            return ExitCode::from(3);
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    match args.command {
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("{}", get_build_info());
            ExitCode::SUCCESS
        }
        Command::List => {
            print_policy_list(args.policy);
            ExitCode::SUCCESS
        }
        Command::Submit => submit(&args),
    }
}

fn print_help() {
    println!(
        r#"cert-preflight - Certification preflight for containers and operators

USAGE:
    cert-preflight [COMMAND] [OPTIONS]

COMMANDS:
    list        List policies and the checks each one runs
    submit      Submit an existing artifacts directory to the catalog
    version     Print version information

LIST OPTIONS:
    --policy <NAME>   Only list one policy: container, scratch, root, operator

SUBMIT OPTIONS:
    --artifacts <DIR>                 Artifacts directory (default: artifacts)
    --certification-project-id <ID>   Certification project id
    --pyxis-api-token <TOKEN>         Catalog API token
    --pyxis-host <HOST>               Catalog host; overrides --pyxis-env
    --pyxis-env <ENV>                 Catalog environment: prod, uat, qa, stage
    --docker-config <FILE>            Registry credentials attached to the project

GENERAL:
    --log-level <LEVEL>   Log level (default: info)
    -h, --help            Print this help message
    -V, --version         Print version information

ENVIRONMENT:
    PFLT_ARTIFACTS, PFLT_CERTIFICATION_PROJECT_ID, PFLT_PYXIS_API_TOKEN,
    PFLT_PYXIS_HOST, PFLT_PYXIS_ENV, PFLT_DOCKERCONFIG, PFLT_LOGLEVEL
    Flags take precedence over environment variables.

EXIT CODES:
    0   Success
    1   Submission failed
    3   Usage or configuration error"#
    );
}

fn print_policy_list(only: Option<Policy>) {
    let policies: Vec<Policy> = match only {
        Some(policy) => vec![policy],
        None => Policy::ALL.to_vec(),
    };

    for (i, policy) in policies.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{} ({}):", policy.title().to_uppercase(), policy);
        for name in policy.check_names() {
            println!("  {}", name);
        }
    }
}

fn submit(args: &Args) -> ExitCode {
    let mut config = PreflightConfig::from_env();
    args.apply_to(&mut config);
    config.submit = true;

    let log = ExecutionLog::new();
    if let Err(e) = logging::init(&args.log_level, Some(&log)) {
        eprintln!("Error: could not initialize logging: {}", e);
        return ExitCode::from(3);
    }

    let Some(catalog_config) = config.catalog_config() else {
        eprintln!("Error: submission requires a certification project id and a catalog API token");
        return ExitCode::from(3);
    };
    let client = match HttpCatalogClient::new(&catalog_config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let store = Arc::new(FsArtifactStore::new(&config.artifacts_dir));
    let ctx = RunContext::new(store).with_log(log);
    let preflight = Preflight::new(config, CheckRegistry::new()).with_catalog(Arc::new(client));

    match preflight.submit_existing(&ctx) {
        Ok(SubmissionOutcome::Submitted(receipt)) => {
            println!("Submitted image {} to project {}", receipt.image_id, receipt.project_id);
            ExitCode::SUCCESS
        }
        Ok(SubmissionOutcome::Skipped { .. }) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::from(1)
        }
    }
}
