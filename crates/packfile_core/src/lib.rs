//! # packfile_core
//!
//! Release compiler for nomad-packfile.
//!
//! A packfile declares registries, environments and releases. The compiler
//! expands every release across the environments it applies to, resolving
//! templated fields and pack references, and then drives a
//! [`PackExecutor`](packfile_runner::PackExecutor) with the result.
//!
//! # Architecture
//!
//! - **Registry catalog**: declared registries by name, first declaration wins
//! - **Pack**: a bare pack name or `registry://<registry>/<pack>`
//! - **Expander**: the environment by release matrix, one action per pair
//! - **Compiler**: owns the environment store and runs commands in order
//!
//! # Example
//!
//! ```rust,ignore
//! use packfile_core::ReleaseCompiler;
//! use packfile_runner::NomadPackCli;
//! use packfile_spec::PackfileReader;
//! use packfile_templates::EnvironmentStore;
//!
//! let config = PackfileReader::read("packfile.yaml")?;
//! let mut compiler = ReleaseCompiler::new(config, EnvironmentStore::capture());
//! compiler.compile()?;
//!
//! let executor = NomadPackCli::new("nomad-pack")?;
//! compiler.plan(&executor).await?;
//! ```

pub mod compiler;
pub mod error;
pub mod expander;
pub mod pack;
pub mod registry;

pub use compiler::ReleaseCompiler;
pub use error::{CoreError, CoreResult};
pub use expander::{ReleaseAction, ReleaseExpander};
pub use pack::Pack;
pub use registry::{RegistryCatalog, RegistryNode};
