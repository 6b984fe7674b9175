//! Registry catalog.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use packfile_runner::RegistrySpec;
use packfile_spec::RegistryConfig;

/// A compiled registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryNode {
    /// Name releases use to refer to this registry
    pub name: String,
    pub url: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RegistryNode {
    /// Describe the registry for an executor.
    pub fn spec(&self) -> RegistrySpec {
        RegistrySpec::new(&self.name, &self.url)
            .git_ref(self.git_ref.clone())
            .target(self.target.clone())
    }
}

impl From<&RegistryConfig> for RegistryNode {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            git_ref: config.git_ref.clone(),
            target: config.target.clone(),
        }
    }
}

/// Registries by name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCatalog {
    registries: IndexMap<String, RegistryNode>,
}

impl RegistryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from declared registries.
    ///
    /// When a name is declared more than once the first declaration wins
    /// and the others are skipped with a warning.
    pub fn build(configs: &[RegistryConfig]) -> Self {
        let mut catalog = Self::new();
        for config in configs {
            if catalog.contains(&config.name) {
                warn!("Registry {} already exists, skipping", config.name);
                continue;
            }
            debug!("Registering registry: {} ({})", config.name, config.url);
            catalog
                .registries
                .insert(config.name.clone(), RegistryNode::from(config));
        }
        catalog
    }

    /// Get a registry by name.
    pub fn get(&self, name: &str) -> Option<&RegistryNode> {
        self.registries.get(name)
    }

    /// Check if a registry is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.registries.contains_key(name)
    }

    /// Iterate registries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryNode> {
        self.registries.values()
    }

    /// Get all registry names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.registries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_keeps_declaration_order() {
        let catalog = RegistryCatalog::build(&[
            RegistryConfig::new("b", "u2"),
            RegistryConfig::new("a", "u1"),
        ]);
        assert_eq!(catalog.names(), vec!["b", "a"]);
    }

    #[test]
    fn test_duplicate_registry_first_wins() {
        let catalog = RegistryCatalog::build(&[
            RegistryConfig::new("a", "u1"),
            RegistryConfig::new("a", "u2"),
        ]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().url, "u1");
    }

    #[test]
    fn test_reordering_unique_names_yields_same_registries() {
        let forward = RegistryCatalog::build(&[
            RegistryConfig::new("a", "u1"),
            RegistryConfig::new("b", "u2").with_ref("v1"),
        ]);
        let reversed = RegistryCatalog::build(&[
            RegistryConfig::new("b", "u2").with_ref("v1"),
            RegistryConfig::new("a", "u1"),
        ]);

        for name in ["a", "b"] {
            assert_eq!(forward.get(name), reversed.get(name));
        }
        assert_eq!(forward.len(), reversed.len());
    }

    #[test]
    fn test_spec_carries_optional_fields() {
        let node = RegistryNode::from(
            &RegistryConfig::new("community", "github.com/x/y").with_target("alertmanager"),
        );
        let spec = node.spec();

        assert_eq!(spec.name, "community");
        assert_eq!(spec.git_ref, None);
        assert_eq!(spec.target.as_deref(), Some("alertmanager"));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = RegistryCatalog::build(&[]);
        assert!(catalog.is_empty());
        assert!(catalog.get("a").is_none());
    }
}
