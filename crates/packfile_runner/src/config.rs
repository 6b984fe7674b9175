//! Invocation types handed to an executor.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// nomad-pack operation applied to a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackCommand {
    Plan,
    Render,
    Run,
}

impl PackCommand {
    /// Get the nomad-pack subcommand name.
    pub fn subcommand(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Render => "render",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for PackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subcommand())
    }
}

/// Registry to add before packs are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    pub name: String,
    pub url: String,
    pub git_ref: Option<String>,
    pub target: Option<String>,
}

impl RegistrySpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            git_ref: None,
            target: None,
        }
    }

    pub fn git_ref(mut self, git_ref: Option<String>) -> Self {
        self.git_ref = git_ref;
        self
    }

    pub fn target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }
}

/// Nomad cluster a release is deployed to.
///
/// Empty values leave the corresponding variable unset for nomad-pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTarget {
    pub nomad_addr: String,
    pub nomad_token: String,
}

impl ClusterTarget {
    pub fn new(nomad_addr: impl Into<String>, nomad_token: impl Into<String>) -> Self {
        Self {
            nomad_addr: nomad_addr.into(),
            nomad_token: nomad_token.into(),
        }
    }
}

/// Everything nomad-pack needs to plan, render or run one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInvocation {
    /// Directory the command runs in; var files are relative to it
    pub work_dir: PathBuf,
    pub var_files: Vec<String>,
    /// Variables in the order they are passed
    pub vars: Vec<(String, String)>,
    /// Pack selection arguments, e.g. `--registry community nginx`
    pub pack_args: Vec<String>,
    pub target: ClusterTarget,
}

impl ReleaseInvocation {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            var_files: Vec::new(),
            vars: Vec::new(),
            pack_args: Vec::new(),
            target: ClusterTarget::default(),
        }
    }

    pub fn var_files(mut self, var_files: Vec<String>) -> Self {
        self.var_files = var_files;
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    pub fn pack_args(mut self, args: Vec<String>) -> Self {
        self.pack_args = args;
        self
    }

    pub fn target(mut self, target: ClusterTarget) -> Self {
        self.target = target;
        self
    }
}
