//! CLI command definitions.
//!
//! Every subcommand loads and compiles the packfile first. `plan`, `render`
//! and `run` then hand the compiled releases to nomad-pack; `compile` only
//! prints them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use packfile_core::ReleaseCompiler;
use packfile_runner::{NomadPackCli, DEFAULT_BINARY};
use packfile_spec::{LoadOptions, PackfileReader};
use packfile_templates::EnvironmentStore;

pub mod compile;
pub mod release;

/// nomad-packfile - declarative releases for nomad-pack
#[derive(Parser)]
#[command(name = "nomad-packfile")]
#[command(version, about = "nomad-packfile - declarative releases for nomad-pack")]
#[command(long_about = r#"
nomad-packfile reads a packfile describing registries, environments and
releases, expands every release for the environments it targets and drives
nomad-pack with the result.

COMMANDS:
  plan     → Show the changes each release would make
  render   → Render the job specifications of each release
  run      → Deploy each release
  compile  → Print the compiled registries and releases

EXIT CODES:
  0 - Success
  1 - General error
  2 - Configuration error
  3 - Template error
  4 - Execution error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Packfile to load
    #[arg(short, long, global = true, default_value = "packfile.yaml")]
    pub file: PathBuf,

    /// Only compile releases for this environment
    #[arg(long, global = true)]
    pub environment: Option<String>,

    /// Only compile releases with this name
    #[arg(long, global = true)]
    pub release: Option<String>,

    /// nomad-pack binary name or path
    #[arg(long, global = true, default_value = DEFAULT_BINARY)]
    pub nomad_pack_binary: PathBuf,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Log nomad-pack commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan every release
    Plan,

    /// Render every release
    Render,

    /// Deploy every release
    Run,

    /// Print the compiled packfile without invoking nomad-pack
    Compile(compile::CompileArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            // tracing has no level above error
            LogLevel::Error | LogLevel::Fatal => LevelFilter::ERROR,
        }
    }
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::new();
        if let Some(environment) = &self.environment {
            options = options.environment(environment);
        }
        if let Some(release) = &self.release {
            options = options.release(release);
        }
        options
    }

    /// Load the packfile and compile it against the process environment.
    pub fn compile(&self) -> Result<ReleaseCompiler> {
        let config = PackfileReader::read_with(&self.file, &self.load_options())
            .with_context(|| format!("Failed to load packfile {}", self.file.display()))?;

        let mut compiler = ReleaseCompiler::new(config, EnvironmentStore::capture());
        compiler
            .compile()
            .with_context(|| format!("Failed to compile {}", self.file.display()))?;

        Ok(compiler)
    }

    pub fn executor(&self) -> Result<NomadPackCli> {
        if self.dry_run {
            return Ok(NomadPackCli::dry_run(self.nomad_pack_binary.clone()));
        }
        Ok(NomadPackCli::new(&self.nomad_pack_binary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["nomad-packfile", "plan"]).unwrap();

        assert_eq!(cli.global.file, PathBuf::from("packfile.yaml"));
        assert_eq!(cli.global.nomad_pack_binary, PathBuf::from("nomad-pack"));
        assert_eq!(cli.global.log_level, LogLevel::Warn);
        assert!(!cli.global.dry_run);
        assert!(matches!(cli.command, Commands::Plan));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nomad-packfile",
            "run",
            "-f",
            "deploy/packfile.yaml",
            "--environment",
            "staging",
            "--release",
            "web",
            "--log-level",
            "fatal",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.global.file, PathBuf::from("deploy/packfile.yaml"));
        assert_eq!(cli.global.environment.as_deref(), Some("staging"));
        assert_eq!(cli.global.release.as_deref(), Some("web"));
        assert_eq!(LevelFilter::from(cli.global.log_level), LevelFilter::ERROR);
        assert!(cli.global.dry_run);
        assert!(matches!(cli.command, Commands::Run));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["nomad-packfile", "--log-level", "trace", "plan"]).is_err());
    }

    #[test]
    fn test_dry_run_executor_skips_binary_lookup() {
        let cli = Cli::try_parse_from([
            "nomad-packfile",
            "--dry-run",
            "--nomad-pack-binary",
            "/definitely/not/here/nomad-pack",
            "plan",
        ])
        .unwrap();

        let executor = cli.global.executor().unwrap();
        assert!(executor.is_dry_run());
    }
}
