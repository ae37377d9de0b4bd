//! Shared helpers for integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use externalsecret_operator::backend::{
    register_builtin, Backend, BackendFactory, BackendManager, BackendRegistry, Parameters,
};
use externalsecret_operator::crd::{ExternalSecret, ExternalSecretSpec};
use externalsecret_operator::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Manager with every built-in adapter registered
pub fn manager() -> BackendManager {
    let registry = BackendRegistry::new();
    register_builtin(&registry);
    BackendManager::new(registry)
}

/// Namespaced, UID-carrying `ExternalSecret`
pub fn external_secret(namespace: &str, uid: &str, backend: &str, key: &str) -> ExternalSecret {
    let mut es = ExternalSecret::new(
        "app-credentials",
        ExternalSecretSpec {
            backend: backend.to_string(),
            key: key.to_string(),
            version: None,
        },
    );
    es.metadata.namespace = Some(namespace.to_string());
    es.metadata.uid = Some(uid.to_string());
    es
}

/// Adapter whose every call sleeps for `delay` before succeeding
#[derive(Debug)]
pub struct SlowBackend {
    pub delay: Duration,
}

pub const SLOW_KIND: &str = "slow";

impl SlowBackend {
    pub fn factory(delay: Duration) -> BackendFactory {
        Arc::new(move || Arc::new(SlowBackend { delay }) as Arc<dyn Backend>)
    }
}

#[async_trait]
impl Backend for SlowBackend {
    fn kind(&self) -> &'static str {
        SLOW_KIND
    }

    async fn init(&self, _parameters: &Parameters, _credentials: &[u8]) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn get(&self, key: &str, _version: Option<&str>) -> Result<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Ok(key.as_bytes().to_vec())
    }
}

/// Adapter whose `init` fails with a missing parameter after `delay`
#[derive(Debug)]
pub struct FailingBackend {
    pub delay: Duration,
}

pub const FAILING_KIND: &str = "failing";

impl FailingBackend {
    pub fn factory(delay: Duration) -> BackendFactory {
        Arc::new(move || Arc::new(FailingBackend { delay }) as Arc<dyn Backend>)
    }
}

#[async_trait]
impl Backend for FailingBackend {
    fn kind(&self) -> &'static str {
        FAILING_KIND
    }

    async fn init(&self, _parameters: &Parameters, _credentials: &[u8]) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Err(Error::MissingParameter("region".to_string()))
    }

    async fn get(&self, _key: &str, _version: Option<&str>) -> Result<Vec<u8>> {
        Err(Error::BackendNotInitialized(FAILING_KIND.to_string()))
    }
}
