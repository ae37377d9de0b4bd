//! # Vault Backend
//!
//! Reads secrets from a `HashiCorp` Vault KV version 2 engine over its HTTP API.
//!
//! Parameters (credentials may supply any of them, and normally carry `token`):
//! - `address` (required): e.g. `https://vault.example.com:8200`
//! - `token` (required)
//! - `mount` (optional): KV mount path, defaults to `secret`
//!
//! Keys have the form `path` or `path#field`. Without a field the whole
//! `data` object is returned as JSON; with one, only that field (strings
//! verbatim, anything else JSON-encoded). `version` maps to the KV version.

use super::{merge_credentials, param_str, require_params, Backend, BackendFactory, Parameters};
use crate::error::{Error, Result};
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const KIND: &str = "vault";

pub const DEFAULT_MOUNT: &str = "secret";

const TOKEN_HEADER: &str = "X-Vault-Token";

struct VaultSession {
    http: reqwest::Client,
    address: String,
    mount: String,
    token: Zeroizing<String>,
}

#[derive(Default)]
pub struct VaultBackend {
    session: OnceLock<VaultSession>,
}

impl std::fmt::Debug for VaultBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.get();
        f.debug_struct("VaultBackend")
            .field("address", &session.map(|s| s.address.as_str()))
            .field("mount", &session.map(|s| s.mount.as_str()))
            .finish()
    }
}

/// `GET /v1/{mount}/data/{path}` response body
#[derive(Debug, Deserialize)]
struct KvReadResponse {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    #[serde(default)]
    data: serde_json::Map<String, Value>,
}

impl VaultBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn factory() -> BackendFactory {
        Arc::new(|| Arc::new(VaultBackend::new()) as Arc<dyn Backend>)
    }
}

/// Split `path#field` into its parts
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once('#') {
        Some((path, field)) if !field.is_empty() => (path, Some(field)),
        Some((path, _)) => (path, None),
        None => (key, None),
    }
}

/// Error body for a failed request, or why it could not be read
fn describe_body<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    match body {
        Ok(body) => body.trim().to_string(),
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

fn render_field(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        other => serde_json::to_vec(other)
            .map_err(|e| Error::transport(KIND, "encode field", e)),
    }
}

#[async_trait]
impl Backend for VaultBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn init(&self, parameters: &Parameters, credentials: &[u8]) -> Result<()> {
        let params = merge_credentials(parameters, credentials)?;
        require_params(&params, &["address", "token"])?;

        if self.session.get().is_some() {
            warn!("vault backend already initialized, keeping the first session");
            return Ok(());
        }

        let address = param_str(&params, "address")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        let mount = param_str(&params, "mount")
            .map(|m| m.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_MOUNT.to_string());
        let token = Zeroizing::new(param_str(&params, "token").unwrap_or_default());

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::transport(KIND, "init", e))?;

        debug!(address = %address, mount = %mount, "Configured Vault backend");
        let _ = self.session.set(VaultSession {
            http,
            address,
            mount,
            token,
        });
        Ok(())
    }

    async fn get(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let session = self
            .session
            .get()
            .ok_or_else(|| Error::BackendNotInitialized(KIND.to_string()))?;
        let (path, field) = split_key(key);
        let context = format!("get '{key}'");

        let url = format!(
            "{}/v1/{}/data/{}",
            session.address,
            session.mount,
            path.trim_start_matches('/')
        );
        let mut request = session
            .http
            .get(&url)
            .header(TOKEN_HEADER, session.token.as_str());
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(KIND, context.clone(), e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::secret_not_found(key, version)),
            status if !status.is_success() => {
                let body = describe_body(response.text().await);
                return Err(Error::transport(
                    KIND,
                    context,
                    anyhow!("unexpected status {status}: {body}"),
                ));
            }
            _ => {}
        }

        let body: KvReadResponse = response
            .json()
            .await
            .context("response is not a KV v2 read")
            .map_err(|e| Error::transport(KIND, context.clone(), e))?;

        match field {
            Some(field) => body
                .data
                .data
                .get(field)
                .ok_or_else(|| Error::secret_not_found(key, version))
                .and_then(render_field),
            None => serde_json::to_vec(&body.data.data)
                .map_err(|e| Error::transport(KIND, context, e)),
        }
    }
}
