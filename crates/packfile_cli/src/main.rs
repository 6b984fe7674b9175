//! nomad-packfile CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Configuration error
//! - 3: Template error
//! - 4: Execution error

use std::process::ExitCode;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use packfile_core::CoreError;
use packfile_runner::{PackCommand, RunnerError};
use packfile_spec::SpecError;
use packfile_templates::TemplateError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const TEMPLATE_ERROR: u8 = 3;
    pub const EXECUTION_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `compile` output stays clean
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(cli.global.log_level).into())
                .from_env_lossy(),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Plan => commands::release::execute(&cli.global, PackCommand::Plan).await,
        Commands::Render => commands::release::execute(&cli.global, PackCommand::Render).await,
        Commands::Run => commands::release::execute(&cli.global, PackCommand::Run).await,
        Commands::Compile(args) => commands::compile::execute(&cli.global, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            return match err {
                CoreError::Execution(_) => ExitCodes::EXECUTION_ERROR,
                err if err.is_configuration_error() => ExitCodes::CONFIG_ERROR,
                err if err.is_template_error() => ExitCodes::TEMPLATE_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.is::<SpecError>() {
            return ExitCodes::CONFIG_ERROR;
        }
        if cause.is::<TemplateError>() {
            return ExitCodes::TEMPLATE_ERROR;
        }
        if cause.is::<RunnerError>() {
            return ExitCodes::EXECUTION_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
