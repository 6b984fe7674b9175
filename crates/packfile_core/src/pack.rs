//! Pack references.

use serde::Serialize;

use packfile_spec::REGISTRY_SCHEME;

use crate::error::{CoreError, CoreResult};
use crate::registry::{RegistryCatalog, RegistryNode};

/// A resolved pack: a name, optionally inside a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pack {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryNode>,
}

impl Pack {
    /// A pack that nomad-pack resolves without a registry.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: None,
        }
    }

    /// A pack inside a registry.
    pub fn in_registry(name: impl Into<String>, registry: RegistryNode) -> Self {
        Self {
            name: name.into(),
            registry: Some(registry),
        }
    }

    /// Resolve a release's pack reference against the catalog.
    ///
    /// `registry://<registry>/<pack>` must name a declared registry; any
    /// other reference is a bare pack name.
    pub fn resolve(release: &str, reference: &str, catalog: &RegistryCatalog) -> CoreResult<Self> {
        let Some(path) = reference.strip_prefix(REGISTRY_SCHEME) else {
            return Ok(Self::bare(reference));
        };

        let invalid = || CoreError::InvalidPackReference {
            release: release.to_string(),
            reference: reference.to_string(),
        };

        let segments: Vec<&str> = path.split('/').collect();
        let [registry_name, pack_name] = segments[..] else {
            return Err(invalid());
        };
        if registry_name.is_empty() || pack_name.is_empty() {
            return Err(invalid());
        }

        let registry = catalog
            .get(registry_name)
            .ok_or_else(|| CoreError::RegistryNotFound {
                release: release.to_string(),
                registry: registry_name.to_string(),
            })?;

        Ok(Self::in_registry(pack_name, registry.clone()))
    }

    /// Pack selection arguments for nomad-pack.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(registry) = &self.registry {
            args.push("--registry".to_string());
            args.push(registry.name.clone());
            if let Some(git_ref) = &registry.git_ref {
                args.push("--ref".to_string());
                args.push(git_ref.clone());
            }
        }
        args.push(self.name.clone());
        args
    }
}
