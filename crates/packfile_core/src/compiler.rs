//! Packfile compiler.

use std::path::PathBuf;

use tracing::{debug, info};

use packfile_runner::{PackCommand, PackExecutor};
use packfile_spec::PackfileConfig;
use packfile_templates::EnvironmentStore;

use crate::error::{CoreError, CoreResult};
use crate::expander::{ReleaseAction, ReleaseExpander};
use crate::registry::{RegistryCatalog, RegistryNode};

/// Compiles a packfile into release actions and drives an executor with them.
///
/// The compiler owns the environment store, so variables loaded from
/// environment files stay visible for the rest of the run.
#[derive(Debug)]
pub struct ReleaseCompiler {
    config: PackfileConfig,
    env: EnvironmentStore,
    catalog: RegistryCatalog,
    releases: Vec<ReleaseAction>,
    compiled: bool,
}

impl ReleaseCompiler {
    pub fn new(config: PackfileConfig, env: EnvironmentStore) -> Self {
        Self {
            config,
            env,
            catalog: RegistryCatalog::new(),
            releases: Vec::new(),
            compiled: false,
        }
    }

    /// Build the registry catalog and expand every release.
    ///
    /// Compiling again starts from scratch. On error the previously
    /// compiled state, including the environment store, is left untouched.
    pub fn compile(&mut self) -> CoreResult<()> {
        let work_dir = self.config.work_dir();
        let catalog = RegistryCatalog::build(&self.config.registries);

        let mut env = self.env.clone();
        let releases = ReleaseExpander::new(&catalog, &work_dir).expand(
            &self.config.environments,
            &self.config.releases,
            &mut env,
        )?;

        debug!(
            "Compiled {} registries and {} releases from {}",
            catalog.len(),
            releases.len(),
            self.config.path.display()
        );

        self.env = env;
        self.catalog = catalog;
        self.releases = releases;
        self.compiled = true;
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn config(&self) -> &PackfileConfig {
        &self.config
    }

    pub fn work_dir(&self) -> PathBuf {
        self.config.work_dir()
    }

    /// Environment variables visible to templates.
    pub fn environment(&self) -> &EnvironmentStore {
        &self.env
    }

    /// Compiled registries in declaration order.
    pub fn registries(&self) -> impl Iterator<Item = &RegistryNode> {
        self.catalog.iter()
    }

    /// Compiled release actions in execution order.
    pub fn releases(&self) -> &[ReleaseAction] {
        &self.releases
    }

    /// Plan every compiled release.
    pub async fn plan(&self, executor: &dyn PackExecutor) -> CoreResult<()> {
        self.execute(PackCommand::Plan, executor).await
    }

    /// Render every compiled release.
    pub async fn render(&self, executor: &dyn PackExecutor) -> CoreResult<()> {
        self.execute(PackCommand::Render, executor).await
    }

    /// Deploy every compiled release.
    pub async fn run(&self, executor: &dyn PackExecutor) -> CoreResult<()> {
        self.execute(PackCommand::Run, executor).await
    }

    /// Add every registry, then apply `command` to each release in order.
    /// Stops at the first failure.
    async fn execute(&self, command: PackCommand, executor: &dyn PackExecutor) -> CoreResult<()> {
        if !self.compiled {
            return Err(CoreError::NotCompiled);
        }

        for registry in self.catalog.iter() {
            info!("Adding registry {} ({})", registry.name, registry.url);
            executor.add_registry(&registry.spec()).await?;
        }

        let total = self.releases.len();
        for (i, action) in self.releases.iter().enumerate() {
            info!(
                "Running {} [{}/{}]: {} ({})",
                command,
                i + 1,
                total,
                action.name,
                action.environment
            );
            executor.execute(command, &action.invocation()).await?;
        }

        info!("{} completed for {} releases", command, total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use packfile_runner::MockExecutor;
    use packfile_spec::{EnvironmentOverride, RegistryConfig, ReleaseTemplate};
    use tempfile::tempdir;

    fn config(dir: &Path) -> PackfileConfig {
        PackfileConfig::new(dir.join("packfile.yaml"))
            .registry(RegistryConfig::new("community", "github.com/x/y"))
            .environment("staging", EnvironmentOverride::new())
            .release(ReleaseTemplate::new("web", "registry://community/web-pack"))
    }

    #[tokio::test]
    async fn test_execute_before_compile() {
        let dir = tempdir().unwrap();
        let compiler = ReleaseCompiler::new(config(dir.path()), EnvironmentStore::new());
        let executor = MockExecutor::new();

        let result = compiler.plan(&executor).await;
        assert!(matches!(result, Err(CoreError::NotCompiled)));
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut compiler = ReleaseCompiler::new(config(dir.path()), EnvironmentStore::new());

        compiler.compile().unwrap();
        let first = compiler.releases().to_vec();
        compiler.compile().unwrap();

        assert_eq!(compiler.releases(), first.as_slice());
        assert_eq!(compiler.registries().count(), 1);
    }

    #[test]
    fn test_failed_compile_keeps_previous_state() {
        let dir = tempdir().unwrap();
        let mut compiler = ReleaseCompiler::new(config(dir.path()), EnvironmentStore::new());
        compiler.compile().unwrap();

        compiler.config.releases.push(ReleaseTemplate::new("bad", "registry://missing/x"));
        assert!(compiler.compile().is_err());

        assert!(compiler.is_compiled());
        assert_eq!(compiler.releases().len(), 1);
    }

    #[test]
    fn test_failed_compile_discards_environment_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("staging.env"), "DATACENTER=dc1\n").unwrap();

        let config = config(dir.path())
            .release(ReleaseTemplate::new("db", "postgres").environment_file("staging.env"))
            .release(ReleaseTemplate::new("bad", "registry://missing/x"));
        let mut compiler = ReleaseCompiler::new(config, EnvironmentStore::new());

        assert!(compiler.compile().is_err());
        assert!(!compiler.environment().contains("DATACENTER"));
        assert!(!compiler.is_compiled());
    }

    #[tokio::test]
    async fn test_commands_dispatch() {
        let dir = tempdir().unwrap();
        let mut compiler = ReleaseCompiler::new(config(dir.path()), EnvironmentStore::new());
        compiler.compile().unwrap();

        let executor = MockExecutor::new();
        compiler.render(&executor).await.unwrap();
        compiler.run(&executor).await.unwrap();

        assert_eq!(
            executor.methods(),
            vec!["add_registry", "render", "add_registry", "run"]
        );
    }
}
