//! # 1Password Backend
//!
//! Reads item passwords from a 1Password vault.
//!
//! Parameters (credentials may supply any of them), checked in this order:
//! `domain`, `email`, `secretKey`, `masterPassword`. `vault` is optional and
//! defaults to `Personal`.
//!
//! Vault access goes through [`OnePasswordClient`]; the default implementation
//! drives the `op` CLI.

use super::{merge_credentials, param_str, require_params, Backend, BackendFactory, Parameters};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

mod cli;

pub use cli::OpCli;

pub const KIND: &str = "onepassword";

/// Name used in error messages
const LABEL: &str = "1password";

/// Vault used when the `vault` parameter is absent
pub const DEFAULT_VAULT: &str = "Personal";

const REQUIRED: [&str; 4] = ["domain", "email", "secretKey", "masterPassword"];

/// Access to a 1Password account
#[async_trait]
pub trait OnePasswordClient: Send + Sync + std::fmt::Debug {
    /// Sign in and keep the resulting session for later calls
    async fn sign_in(
        &self,
        domain: &str,
        email: &str,
        secret_key: &str,
        master_password: &str,
    ) -> anyhow::Result<()>;

    /// Password of `item` in `vault`, or `None` when the item does not exist
    async fn get_item(&self, vault: &str, item: &str) -> anyhow::Result<Option<String>>;
}

#[derive(Debug)]
pub struct OnePasswordBackend {
    client: Box<dyn OnePasswordClient>,
    vault: OnceLock<String>,
}

impl Default for OnePasswordBackend {
    fn default() -> Self {
        Self::with_client(Box::new(OpCli::new()))
    }
}

impl OnePasswordBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(client: Box<dyn OnePasswordClient>) -> Self {
        Self {
            client,
            vault: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn factory() -> BackendFactory {
        Arc::new(|| Arc::new(OnePasswordBackend::new()) as Arc<dyn Backend>)
    }
}

#[async_trait]
impl Backend for OnePasswordBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn init(&self, parameters: &Parameters, credentials: &[u8]) -> Result<()> {
        let params = merge_credentials(parameters, credentials)?;
        require_params(&params, &REQUIRED)?;

        if self.vault.get().is_some() {
            warn!("onepassword backend already initialized, keeping the first session");
            return Ok(());
        }

        let [domain, email, secret_key, master_password] =
            REQUIRED.map(|name| param_str(&params, name).unwrap_or_default());
        let vault = param_str(&params, "vault").unwrap_or_else(|| DEFAULT_VAULT.to_string());

        self.client
            .sign_in(&domain, &email, &secret_key, &master_password)
            .await
            .map_err(|e| Error::transport(LABEL, "init", e))?;

        debug!(domain = %domain, vault = %vault, "Signed in to 1Password");
        let _ = self.vault.set(vault);
        Ok(())
    }

    async fn get(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let vault = self
            .vault
            .get()
            .ok_or_else(|| Error::BackendNotInitialized(KIND.to_string()))?;

        if let Some(version) = version {
            debug!(item = key, version = version, "1Password items are not versioned, ignoring version");
        }

        match self.client.get_item(vault, key).await {
            Ok(Some(value)) => Ok(value.into_bytes()),
            Ok(None) => Err(Error::secret_not_found(key, version)),
            Err(e) => Err(Error::transport(LABEL, format!("get '{key}'"), e)),
        }
    }
}
