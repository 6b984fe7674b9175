//! Plan, render and run commands.

use anyhow::{Context, Result};
use tracing::info;

use packfile_runner::PackCommand;

use super::GlobalArgs;

pub async fn execute(global: &GlobalArgs, command: PackCommand) -> Result<()> {
    let compiler = global.compile()?;
    let executor = global.executor()?;

    info!(
        "Executing {} for {} releases from {}",
        command,
        compiler.releases().len(),
        global.file.display()
    );

    let result = match command {
        PackCommand::Plan => compiler.plan(&executor).await,
        PackCommand::Render => compiler.render(&executor).await,
        PackCommand::Run => compiler.run(&executor).await,
    };
    result.with_context(|| format!("{} failed", command))?;

    Ok(())
}
