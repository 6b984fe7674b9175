//! Data models for the packfile.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Environment marker that makes a release apply to every environment.
pub const ALL_ENVIRONMENTS: &str = "all";

/// Prefix of pack references that point into a declared registry.
pub const REGISTRY_SCHEME: &str = "registry://";

/// A pack registry declared in the packfile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Name used by releases to refer to this registry
    pub name: String,
    /// Source location of the registry
    pub url: String,
    /// Version pin (branch, tag or commit)
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Sub-pack selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RegistryConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            git_ref: None,
            target: None,
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A release declaration, expanded once per matching environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseTemplate {
    pub name: String,
    /// Bare pack name or `registry://<registry>/<pack>`
    pub pack: String,
    #[serde(default)]
    pub var_files: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub vars: IndexMap<String, String>,
    /// Environments this release applies to; `None`, empty or `all` means every one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
    #[serde(default)]
    pub environment_files: Vec<String>,
    #[serde(default)]
    pub nomad_addr: String,
    #[serde(default)]
    pub nomad_token: String,
}

impl ReleaseTemplate {
    pub fn new(name: impl Into<String>, pack: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pack: pack.into(),
            ..Default::default()
        }
    }

    pub fn var_file(mut self, path: impl Into<String>) -> Self {
        self.var_files.push(path.into());
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environments
            .get_or_insert_with(Vec::new)
            .push(name.into());
        self
    }

    pub fn environment_file(mut self, path: impl Into<String>) -> Self {
        self.environment_files.push(path.into());
        self
    }

    pub fn nomad_addr(mut self, addr: impl Into<String>) -> Self {
        self.nomad_addr = addr.into();
        self
    }

    pub fn nomad_token(mut self, token: impl Into<String>) -> Self {
        self.nomad_token = token.into();
        self
    }

    /// Check whether this release is deployed to the given environment.
    pub fn applies_to(&self, environment: &str) -> bool {
        match &self.environments {
            None => true,
            Some(names) if names.is_empty() => true,
            Some(names) => names
                .iter()
                .any(|n| n == environment || n == ALL_ENVIRONMENTS),
        }
    }
}

/// Connection settings an environment forces onto its releases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentOverride {
    #[serde(default)]
    pub nomad_addr: String,
    #[serde(default)]
    pub nomad_token: String,
}

impl EnvironmentOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nomad_addr(mut self, addr: impl Into<String>) -> Self {
        self.nomad_addr = addr.into();
        self
    }

    pub fn nomad_token(mut self, token: impl Into<String>) -> Self {
        self.nomad_token = token.into();
        self
    }
}

/// Root packfile document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackfileConfig {
    #[serde(default)]
    pub registries: Vec<RegistryConfig>,
    /// Environments in declaration order
    #[serde(default, deserialize_with = "deserialize_environments")]
    pub environments: IndexMap<String, EnvironmentOverride>,
    #[serde(default)]
    pub releases: Vec<ReleaseTemplate>,
    /// Location the packfile was read from
    #[serde(skip)]
    pub path: PathBuf,
}

impl PackfileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registries.push(registry);
        self
    }

    pub fn environment(mut self, name: impl Into<String>, overrides: EnvironmentOverride) -> Self {
        self.environments.insert(name.into(), overrides);
        self
    }

    pub fn release(mut self, release: ReleaseTemplate) -> Self {
        self.releases.push(release);
        self
    }

    /// Directory containing the packfile. Relative paths resolve against it.
    pub fn work_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Restrict the packfile to a single environment.
    ///
    /// An environment that is not declared is kept with empty overrides.
    pub fn select_environment(&mut self, name: &str) {
        let overrides = self.environments.swap_remove(name).unwrap_or_default();
        self.environments = IndexMap::new();
        self.environments.insert(name.to_string(), overrides);
    }

    /// Restrict the packfile to releases with the given name.
    pub fn select_release(&mut self, name: &str) {
        self.releases.retain(|r| r.name == name);
    }
}

fn deserialize_environments<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, EnvironmentOverride>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Option<EnvironmentOverride>>> =
        Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, overrides)| (name, overrides.unwrap_or_default()))
        .collect())
}

/// Accept numbers and booleans as variable values, the way YAML authors write them.
fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(D::Error::custom(format!(
                        "var {} must be a scalar, got {:?}",
                        key, other
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
