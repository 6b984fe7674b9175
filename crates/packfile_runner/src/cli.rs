//! nomad-pack CLI executor.
//!
//! Translates registries and release invocations into `nomad-pack`
//! process invocations. Release commands stream their output to the
//! operator's terminal and only see HOME, TERM and the cluster target.
//! Registry commands capture their output and inherit the full
//! environment, since fetching a registry runs git from PATH.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::{ClusterTarget, PackCommand, RegistrySpec, ReleaseInvocation};
use crate::error::{RunnerError, RunnerResult};
use crate::executor::PackExecutor;

/// Default name of the nomad-pack binary.
pub const DEFAULT_BINARY: &str = "nomad-pack";

/// Variables forwarded from the parent environment to nomad-pack.
const FORWARDED_VARS: [&str; 2] = ["HOME", "TERM"];

/// Executor that shells out to the nomad-pack binary.
#[derive(Debug, Clone)]
pub struct NomadPackCli {
    binary: PathBuf,
    dry_run: bool,
}

impl NomadPackCli {
    /// Create an executor for the given binary name or path.
    ///
    /// Fails when the binary cannot be found or is not executable.
    pub fn new(binary: impl AsRef<Path>) -> RunnerResult<Self> {
        let binary = Self::resolve_binary(binary.as_ref())?;
        info!("Using nomad-pack binary: {:?}", binary);

        Ok(Self {
            binary,
            dry_run: false,
        })
    }

    /// Create an executor that only logs the commands it would run.
    ///
    /// The binary is not looked up, so planning works on machines without nomad-pack.
    pub fn dry_run(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            dry_run: true,
        }
    }

    /// Get the resolved binary path.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve a binary the way a shell would.
    ///
    /// Paths with a directory component are used as-is; bare names are
    /// searched on `PATH`.
    pub fn resolve_binary(binary: &Path) -> RunnerResult<PathBuf> {
        if binary.components().count() > 1 {
            if is_executable(binary) {
                return Ok(binary.to_path_buf());
            }
            return Err(RunnerError::BinaryNotFound(binary.display().to_string()));
        }

        let search_path = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&search_path)
            .map(|dir| dir.join(binary))
            .find(|candidate| is_executable(candidate))
            .ok_or_else(|| {
                RunnerError::BinaryNotFound(format!("{} (not found on PATH)", binary.display()))
            })
    }

    /// Build the arguments for adding a registry.
    pub fn registry_args(registry: &RegistrySpec) -> Vec<String> {
        let mut args = vec![
            "registry".to_string(),
            "add".to_string(),
            registry.name.clone(),
            registry.url.clone(),
        ];

        if let Some(git_ref) = &registry.git_ref {
            args.push(format!("--ref={}", git_ref));
        }
        if let Some(target) = &registry.target {
            args.push(format!("--target={}", target));
        }

        args
    }

    /// Build the arguments for planning, rendering or running a release.
    pub fn release_args(command: PackCommand, invocation: &ReleaseInvocation) -> Vec<String> {
        let mut args = vec![command.subcommand().to_string()];

        // Plan reports changes through its output, not its exit code
        if command == PackCommand::Plan {
            args.push("--diff".to_string());
            args.push("--exit-code-makes-changes=0".to_string());
        }

        for var_file in &invocation.var_files {
            args.push("-var-file".to_string());
            args.push(var_file.clone());
        }

        for (key, value) in &invocation.vars {
            args.push("-var".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.extend(invocation.pack_args.iter().cloned());

        args
    }

    /// Format command for logging.
    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.binary.display().to_string();
        for arg in args {
            if arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    /// Build a command that inherits the parent environment.
    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Build a release command with a clean environment targeting one cluster.
    fn release_command(&self, args: &[String], target: &ClusterTarget) -> Command {
        let mut cmd = self.command(args);
        cmd.env_clear();

        for name in FORWARDED_VARS {
            if let Some(value) = std::env::var_os(name) {
                cmd.env(name, value);
            }
        }
        if !target.nomad_addr.is_empty() {
            cmd.env("NOMAD_ADDR", &target.nomad_addr);
        }
        if !target.nomad_token.is_empty() {
            cmd.env("NOMAD_TOKEN", &target.nomad_token);
        }

        cmd
    }

    async fn execute_release(
        &self,
        command: PackCommand,
        invocation: &ReleaseInvocation,
    ) -> RunnerResult<()> {
        let args = Self::release_args(command, invocation);
        let formatted = self.format_command(&args);

        if self.dry_run {
            info!("[dry-run] Would execute in {:?}: {}", invocation.work_dir, formatted);
            return Ok(());
        }

        info!("Running {} in {:?}: {}", command, invocation.work_dir, formatted);

        let mut cmd = self.release_command(&args, &invocation.target);
        cmd.current_dir(&invocation.work_dir);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        let status = cmd.status().await.map_err(|source| RunnerError::Spawn {
            command: formatted.clone(),
            source,
        })?;

        if !status.success() {
            error!("Error running {}", command);
            return Err(RunnerError::CommandFailed {
                command: formatted,
                status: status.to_string(),
                stderr: String::new(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl PackExecutor for NomadPackCli {
    async fn add_registry(&self, registry: &RegistrySpec) -> RunnerResult<()> {
        let args = Self::registry_args(registry);
        let formatted = self.format_command(&args);

        if self.dry_run {
            info!("[dry-run] Would execute: {}", formatted);
            return Ok(());
        }

        info!("Adding registry {} {}", registry.name, registry.url);

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                command: formatted.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!("Error adding registry {} {}", registry.name, registry.url);
            error!("{}", stderr.trim_end());
            return Err(RunnerError::CommandFailed {
                command: formatted,
                status: output.status.to_string(),
                stderr,
            });
        }

        info!("Registry {} added", registry.name);
        Ok(())
    }

    async fn plan(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.execute_release(PackCommand::Plan, invocation).await
    }

    async fn render(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.execute_release(PackCommand::Render, invocation).await
    }

    async fn run(&self, invocation: &ReleaseInvocation) -> RunnerResult<()> {
        self.execute_release(PackCommand::Run, invocation).await
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_args() {
        let registry = RegistrySpec::new("community", "github.com/hashicorp/nomad-pack-community-registry");
        assert_eq!(
            NomadPackCli::registry_args(&registry),
            vec![
                "registry",
                "add",
                "community",
                "github.com/hashicorp/nomad-pack-community-registry"
            ]
        );
    }

    #[test]
    fn test_registry_args_with_ref_and_target() {
        let registry = RegistrySpec::new("community", "github.com/x/y")
            .git_ref(Some("main".to_string()))
            .target(Some("alertmanager".to_string()));

        let args = NomadPackCli::registry_args(&registry);
        assert_eq!(&args[4..], &["--ref=main", "--target=alertmanager"]);
    }

    #[test]
    fn test_plan_args() {
        let invocation = ReleaseInvocation::new("/deploy")
            .var_files(vec!["vars/staging.hcl".to_string()])
            .var("replicas", "3")
            .pack_args(vec![
                "--registry".to_string(),
                "community".to_string(),
                "nginx".to_string(),
            ]);

        assert_eq!(
            NomadPackCli::release_args(PackCommand::Plan, &invocation),
            vec![
                "plan",
                "--diff",
                "--exit-code-makes-changes=0",
                "-var-file",
                "vars/staging.hcl",
                "-var",
                "replicas=3",
                "--registry",
                "community",
                "nginx",
            ]
        );
    }

    #[test]
    fn test_run_and_render_args_have_no_plan_flags() {
        let invocation = ReleaseInvocation::new("/deploy").pack_args(vec!["nginx".to_string()]);

        assert_eq!(NomadPackCli::release_args(PackCommand::Run, &invocation), vec!["run", "nginx"]);
        assert_eq!(
            NomadPackCli::release_args(PackCommand::Render, &invocation),
            vec!["render", "nginx"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        let executor = NomadPackCli::dry_run("/nonexistent/nomad-pack");
        assert!(executor.is_dry_run());

        let invocation = ReleaseInvocation::new("/nonexistent").pack_args(vec!["nginx".to_string()]);
        executor.plan(&invocation).await.unwrap();
        executor
            .add_registry(&RegistrySpec::new("community", "github.com/x/y"))
            .await
            .unwrap();
    }

    #[test]
    fn test_new_with_missing_binary() {
        let result = NomadPackCli::new("I_DONT_EXIST_nomad_pack");
        assert!(matches!(result, Err(RunnerError::BinaryNotFound(_))));

        let result = NomadPackCli::new("/nonexistent/dir/nomad-pack");
        assert!(matches!(result, Err(RunnerError::BinaryNotFound(_))));
    }
}
