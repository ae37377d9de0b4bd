//! # Backends
//!
//! Pluggable secret-store adapters and the machinery that turns declarative
//! configuration into named, initialized instances.
//!
//! - [`Backend`] is the capability every adapter implements.
//! - [`BackendRegistry`] maps a backend kind (`"asm"`, `"onepassword"`, ...) to a
//!   constructor producing an uninitialized adapter.
//! - [`BackendDirectory`] maps an instance name to a live adapter.
//! - [`BackendManager`] owns both behind one synchronized facade and implements
//!   the configuration loader entry points.
//!
//! Adapters are registered explicitly by process bootstrap through
//! [`register_builtin`], in a fixed order.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

pub mod asm;
mod directory;
pub mod dummy;
mod manager;
pub mod onepassword;
mod registry;
pub mod vault;

pub use directory::{BackendDirectory, Publication};
pub use manager::BackendManager;
pub use registry::{BackendFactory, BackendRegistry};

/// Free-form adapter parameters, keyed by parameter name
pub type Parameters = BTreeMap<String, Value>;

/// Secret-store adapter
///
/// An adapter is constructed uninitialized by its registered factory, then
/// initialized exactly once with `init`. Both methods take `&self`: adapters
/// keep their session state behind interior mutability so a single instance
/// can serve concurrent `get` calls.
///
/// `get` must not retry internally; retry policy belongs to the caller.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Backend kind this adapter was registered under
    fn kind(&self) -> &'static str;

    /// Validate parameters and establish session state
    ///
    /// `credentials` is an opaque payload kept apart from `parameters`; adapters
    /// that need it decode it with [`decode_credentials`].
    async fn init(&self, parameters: &Parameters, credentials: &[u8]) -> Result<()>;

    /// Fetch the raw value stored under `key`, optionally at `version`
    async fn get(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>>;

    /// Release session state when the instance is replaced or removed
    async fn close(&self) {}
}

/// Register every adapter shipped with the operator
///
/// Order is fixed so that startup logs are reproducible.
pub fn register_builtin(registry: &BackendRegistry) {
    registry.register(dummy::KIND, dummy::DummyBackend::factory());
    registry.register(asm::KIND, asm::AsmBackend::factory());
    registry.register(onepassword::KIND, onepassword::OnePasswordBackend::factory());
    registry.register(vault::KIND, vault::VaultBackend::factory());
}

/// Read a parameter as a string
///
/// Numbers and booleans are rendered with their JSON representation; `null`,
/// arrays and objects are treated as absent.
#[must_use]
pub fn param_str(parameters: &Parameters, name: &str) -> Option<String> {
    match parameters.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Fail with [`Error::MissingParameter`] naming the first absent entry of `names`
pub fn require_params(parameters: &Parameters, names: &[&str]) -> Result<()> {
    match names
        .iter()
        .find(|name| param_str(parameters, name).is_none())
    {
        Some(missing) => Err(Error::MissingParameter((*missing).to_string())),
        None => Ok(()),
    }
}

/// Decode a credentials payload as a JSON object
///
/// An empty (or whitespace-only) payload decodes to an empty map.
pub fn decode_credentials(credentials: &[u8]) -> Result<Parameters> {
    if credentials.iter().all(u8::is_ascii_whitespace) {
        return Ok(Parameters::new());
    }
    serde_json::from_slice(credentials)
        .map_err(|e| Error::ConfigInvalid(format!("credentials are not a JSON object: {e}")))
}

/// Overlay decoded credentials on top of parameters
///
/// Credential entries win over parameters of the same name.
pub fn merge_credentials(parameters: &Parameters, credentials: &[u8]) -> Result<Parameters> {
    let mut merged = parameters.clone();
    merged.extend(decode_credentials(credentials)?);
    Ok(merged)
}
