//! Packfile reading utilities.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::PackfileConfig;

/// Filters applied while loading a packfile.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Only compile this environment
    pub environment: Option<String>,
    /// Only compile releases with this name
    pub release: Option<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = Some(name.into());
        self
    }

    pub fn release(mut self, name: impl Into<String>) -> Self {
        self.release = Some(name.into());
        self
    }
}

/// Reader for packfiles.
pub struct PackfileReader;

impl PackfileReader {
    /// Read a packfile without filtering.
    pub fn read(path: impl AsRef<Path>) -> SpecResult<PackfileConfig> {
        Self::read_with(path, &LoadOptions::default())
    }

    /// Read a packfile and apply the environment and release filters.
    pub fn read_with(path: impl AsRef<Path>, options: &LoadOptions) -> SpecResult<PackfileConfig> {
        let path = path.as_ref();
        debug!("Reading packfile from {:?}", path);

        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content).map_err(|e| match e {
            SpecError::Yaml(err) => SpecError::InvalidConfig {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
            other => other,
        })?;
        config.path = path.to_path_buf();

        if let Some(environment) = options.environment.as_deref().filter(|e| !e.is_empty()) {
            debug!("Restricting packfile to environment {}", environment);
            config.select_environment(environment);
        }
        if let Some(release) = options.release.as_deref().filter(|r| !r.is_empty()) {
            debug!("Restricting packfile to release {}", release);
            config.select_release(release);
        }

        Ok(config)
    }

    /// Parse packfile YAML content.
    pub fn parse(content: &str) -> SpecResult<PackfileConfig> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(PackfileConfig::default());
        }
        let config: PackfileConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}
