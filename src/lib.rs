//! scarr
//!
//! Provisions and maintains a static site on AWS: domain registration,
//! TLS certificate, website bucket, CDN distribution, apex DNS alias and
//! content sync with cache invalidation. Every step checks current state
//! before acting, so a deploy can be re-run after any interruption.

pub mod config;
pub mod dns;
pub mod error;
pub mod init;
pub mod orchestrator;
pub mod poller;
pub mod prompt;
pub mod providers;
pub mod reconcile;
pub mod reporter;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::DeploymentSpec;
pub use error::{DeployError, ProviderError};
pub use orchestrator::{DeployOptions, DeployReport, Deployer};
