//! Compile command - print the compiled packfile.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use packfile_core::{RegistryNode, ReleaseAction, ReleaseCompiler};

use super::GlobalArgs;

#[derive(Args)]
pub struct CompileArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Compiled packfile as printed by `compile`.
#[derive(Serialize)]
struct CompiledPackfile<'a> {
    registries: Vec<&'a RegistryNode>,
    releases: &'a [ReleaseAction],
}

impl<'a> CompiledPackfile<'a> {
    fn new(compiler: &'a ReleaseCompiler) -> Self {
        Self {
            registries: compiler.registries().collect(),
            releases: compiler.releases(),
        }
    }
}

fn render(compiler: &ReleaseCompiler, format: OutputFormat) -> Result<String> {
    let compiled = CompiledPackfile::new(compiler);
    let output = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&compiled)?,
        OutputFormat::Json => serde_json::to_string_pretty(&compiled)?,
    };
    Ok(output)
}

pub async fn execute(global: &GlobalArgs, args: CompileArgs) -> Result<()> {
    let compiler = global.compile()?;
    println!("{}", render(&compiler, args.format)?.trim_end());
    Ok(())
}
