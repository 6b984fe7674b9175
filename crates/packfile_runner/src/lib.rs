//! # packfile_runner
//!
//! nomad-pack execution wrapper for nomad-packfile.
//!
//! This crate defines the [`PackExecutor`] capability the release compiler
//! drives, and two implementations:
//!
//! - **NomadPackCli**: shells out to the `nomad-pack` binary
//! - **MockExecutor**: records calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use packfile_runner::{ClusterTarget, NomadPackCli, PackExecutor, ReleaseInvocation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = NomadPackCli::new("nomad-pack")?;
//!
//!     let invocation = ReleaseInvocation::new("./deploy")
//!         .var("replicas", "2")
//!         .pack_args(vec!["nginx".to_string()])
//!         .target(ClusterTarget::new("http://127.0.0.1:4646", ""));
//!
//!     executor.plan(&invocation).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod mock;

pub use cli::{NomadPackCli, DEFAULT_BINARY};
pub use config::{ClusterTarget, PackCommand, RegistrySpec, ReleaseInvocation};
pub use error::{RunnerError, RunnerResult};
pub use executor::PackExecutor;
pub use mock::{CapturedCall, MockExecutor};
