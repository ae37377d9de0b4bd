//! # Dummy Backend
//!
//! Deterministic reference adapter: `get(key)` returns `key` followed by the
//! configured `suffix`. Accepts any parameter set.

use super::{param_str, Backend, BackendFactory, Parameters};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::warn;

pub const KIND: &str = "dummy";

#[derive(Debug, Default)]
pub struct DummyBackend {
    suffix: OnceLock<String>,
}

impl DummyBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn factory() -> BackendFactory {
        Arc::new(|| Arc::new(DummyBackend::new()) as Arc<dyn Backend>)
    }
}

#[async_trait]
impl Backend for DummyBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn init(&self, parameters: &Parameters, _credentials: &[u8]) -> Result<()> {
        let suffix = param_str(parameters, "suffix").unwrap_or_default();
        if self.suffix.set(suffix).is_err() {
            warn!("dummy backend already initialized, keeping the first configuration");
        }
        Ok(())
    }

    async fn get(&self, key: &str, _version: Option<&str>) -> Result<Vec<u8>> {
        let suffix = self
            .suffix
            .get()
            .ok_or_else(|| Error::BackendNotInitialized(KIND.to_string()))?;
        Ok(format!("{key}{suffix}").into_bytes())
    }
}
