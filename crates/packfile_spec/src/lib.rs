//! # packfile_spec
//!
//! Packfile configuration for nomad-packfile.
//!
//! A packfile declares pack registries, deployment environments and the
//! releases to deploy into them:
//!
//! ```yaml
//! registries:
//!   - name: community
//!     url: github.com/hashicorp/nomad-pack-community-registry
//! environments:
//!   staging:
//!     nomad-addr: https://nomad.staging:4646
//! releases:
//!   - name: web
//!     pack: registry://community/nginx
//!     environments: [staging]
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use packfile_spec::{LoadOptions, PackfileReader};
//!
//! let options = LoadOptions::new().environment("staging");
//! let config = PackfileReader::read_with("packfile.yaml", &options).unwrap();
//! println!("{} releases", config.releases.len());
//! ```

pub mod error;
pub mod models;
pub mod reader;

pub use error::{SpecError, SpecResult};
pub use models::{
    EnvironmentOverride, PackfileConfig, RegistryConfig, ReleaseTemplate, ALL_ENVIRONMENTS,
    REGISTRY_SCHEME,
};
pub use reader::{LoadOptions, PackfileReader};
