//! # packfile_templates
//!
//! Template resolution for nomad-packfile.
//!
//! Addresses, tokens, var-file paths and variables in a packfile may refer
//! to the environment being compiled and to environment variables:
//!
//! - `{{ .Environment.Name }}` - name of the current environment
//! - `{{ .Env.NOMAD_TOKEN }}` - an environment variable
//!
//! Environment variables come from an [`EnvironmentStore`], a snapshot that
//! dotenv files can be loaded into without touching the process environment.
//!
//! ## Example
//!
//! ```rust
//! use packfile_templates::{EnvironmentStore, TemplateResolver};
//!
//! let mut store = EnvironmentStore::new();
//! store.set("DC", "dc1");
//!
//! let resolver = TemplateResolver::new();
//! let context = store.context("staging");
//! let path = resolver.resolve("vars/{{ .Environment.Name }}-{{ .Env.DC }}.hcl", &context).unwrap();
//! assert_eq!(path, "vars/staging-dc1.hcl");
//! ```

pub mod context;
pub mod error;
pub mod resolver;

pub use context::{EnvironmentContext, EnvironmentStore, TemplateContext};
pub use error::{TemplateError, TemplateResult};
pub use resolver::TemplateResolver;
