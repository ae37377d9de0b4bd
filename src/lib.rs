//! # `ExternalSecret` Operator
//!
//! Materializes values held in external secret stores into Kubernetes
//! `Secret`s.
//!
//! An `ExternalSecretBackend` resource configures a named backend instance
//! (AWS Secrets Manager, 1Password, Vault, or the `dummy` reference
//! backend). An `ExternalSecret` resource names an instance and a key; the
//! operator fetches the value and writes a `Secret` of the same name, owned
//! by the `ExternalSecret`.
//!
//! ## Modules
//!
//! - [`backend`]: adapter trait, type registry, instance directory, loader
//! - [`secret`]: materializer
//! - [`controller`]: reconciliation driver
//! - [`config`], [`crd`], [`observability`], [`server`]: ambient plumbing

pub mod backend;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod secret;
pub mod server;

pub use error::{Error, Result};
