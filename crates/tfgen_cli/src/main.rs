//! tfgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Generation failure (some records were skipped)
//! - 5: Reconciliation failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

mod commands;
mod error;

use commands::{Cli, Commands};
use error::CliError;
use tfgen_iac::IacError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const GENERATION_FAILURE: u8 = 3;
    pub const RECONCILIATION_FAILURE: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::Config(args) => commands::config::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "tfgen=debug" } else { "tfgen=info" };
    let mut filter = EnvFilter::from_default_env();
    for directive in [level, "warn"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if json {
        registry.with(fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CliError>() {
            return match err {
                CliError::InvalidArguments(_) => ExitCodes::INVALID_ARGS,
                CliError::GenerationFailed { .. } => ExitCodes::GENERATION_FAILURE,
                CliError::ReconciliationFailed { .. } => ExitCodes::RECONCILIATION_FAILURE,
            };
        }
        if let Some(IacError::Config(_)) = cause.downcast_ref::<IacError>() {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_categorize_error() {
        let err = anyhow::Error::new(CliError::ReconciliationFailed { failed: 2 });
        assert_eq!(categorize_error(&err), ExitCodes::RECONCILIATION_FAILURE);

        let err = anyhow::Error::new(CliError::GenerationFailed { skipped: 1 })
            .context("generation run");
        assert_eq!(categorize_error(&err), ExitCodes::GENERATION_FAILURE);

        let err = anyhow::Error::new(IacError::Config("tenant_id is required".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);

        let err: anyhow::Error = Err::<(), _>(std::io::Error::from(std::io::ErrorKind::Other))
            .context("writing files")
            .unwrap_err();
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
