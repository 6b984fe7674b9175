//! Executor trait.

use async_trait::async_trait;

use crate::config::{PackCommand, RegistrySpec, ReleaseInvocation};
use crate::error::RunnerResult;

/// Capability to drive nomad-pack.
///
/// Implementations keep no per-release state: the cluster address and token
/// travel with every [`ReleaseInvocation`].
#[async_trait]
pub trait PackExecutor: Send + Sync {
    /// Add a registry so its packs can be referenced.
    async fn add_registry(&self, registry: &RegistrySpec) -> RunnerResult<()>;

    /// Plan a release.
    async fn plan(&self, invocation: &ReleaseInvocation) -> RunnerResult<()>;

    /// Render a release's job specifications.
    async fn render(&self, invocation: &ReleaseInvocation) -> RunnerResult<()>;

    /// Deploy a release.
    async fn run(&self, invocation: &ReleaseInvocation) -> RunnerResult<()>;

    /// Dispatch to `plan`, `render` or `run`.
    async fn execute(&self, command: PackCommand, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        match command {
            PackCommand::Plan => self.plan(invocation).await,
            PackCommand::Render => self.render(invocation).await,
            PackCommand::Run => self.run(invocation).await,
        }
    }
}
