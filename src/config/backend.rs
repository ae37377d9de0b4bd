//! # Backend Configuration Envelope
//!
//! The `{ Type, Parameters, Auth }` document describing one backend instance.
//! It arrives either as JSON in a process-wide environment variable or from an
//! `ExternalSecretBackend` resource.

use crate::backend::Parameters;
use crate::crd::ExternalSecretBackendSpec;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration envelope for one backend instance
///
/// ```json
/// {
///   "Type": "asm",
///   "Parameters": { "region": "eu-west-1" },
///   "Auth": { "accessKeyID": "...", "secretAccessKey": "..." }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend kind, key into the type registry
    #[serde(rename = "Type", alias = "type")]
    pub backend_type: String,
    #[serde(rename = "Parameters", alias = "parameters", default)]
    pub parameters: Parameters,
    /// Credentials, kept apart from parameters
    #[serde(rename = "Auth", alias = "auth", default)]
    pub auth: Parameters,
}

impl BackendConfig {
    #[must_use]
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: backend_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Parse an envelope from JSON
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| Error::ConfigInvalid(e.to_string()))
    }

    /// Read and parse the envelope held in environment variable `var`
    pub fn from_env_var(var: &str) -> Result<Self> {
        let payload = std::env::var(var)
            .ok()
            .ok_or_else(|| Error::ConfigNotFound(var.to_string()))?;
        Self::from_json(&payload)
    }

    /// Credentials payload handed to the adapter's `init`
    ///
    /// Explicit credential bytes take precedence; otherwise a non-empty `Auth`
    /// map is encoded as JSON.
    pub fn credentials_payload(&self, credentials: &[u8]) -> Result<Vec<u8>> {
        if !credentials.is_empty() {
            return Ok(credentials.to_vec());
        }
        if self.auth.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::to_vec(&self.auth).map_err(|e| Error::ConfigInvalid(e.to_string()))
    }
}

impl From<&ExternalSecretBackendSpec> for BackendConfig {
    fn from(spec: &ExternalSecretBackendSpec) -> Self {
        let to_values = |map: &std::collections::BTreeMap<String, String>| -> Parameters {
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect()
        };
        Self {
            backend_type: spec.backend_type.clone(),
            parameters: to_values(&spec.parameters),
            auth: to_values(&spec.auth),
        }
    }
}
