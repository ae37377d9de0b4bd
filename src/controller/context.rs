//! # Context
//!
//! State shared by every reconciliation.

use crate::backend::BackendManager;
use crate::config::ControllerConfig;
use crate::controller::backoff::ResourceBackoffs;
use kube::Client;
use std::sync::Arc;

pub struct Context {
    pub client: Client,
    pub backends: Arc<BackendManager>,
    pub config: ControllerConfig,
    pub backoffs: ResourceBackoffs,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("backends", &self.backends)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    #[must_use]
    pub fn new(client: Client, backends: Arc<BackendManager>, config: ControllerConfig) -> Self {
        let backoffs = ResourceBackoffs::new(config.backoff_min_secs, config.backoff_max_secs);
        Self {
            client,
            backends,
            config,
            backoffs,
        }
    }
}
