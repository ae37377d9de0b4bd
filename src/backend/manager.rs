//! # Backend Manager
//!
//! Single synchronized facade over the type registry and the instance
//! directory, plus the two configuration loader entry points.
//!
//! The manager is built once at bootstrap, shared behind an `Arc` by every
//! reconciliation, and dropped with the process. All registry and directory
//! access goes through `RwLock`s that are never held across an `.await`, so
//! `get` calls on distinct or identical instance names proceed in parallel.
//!
//! Every adapter call is bounded by the manager's timeout; an expired call
//! fails with [`Error::Cancelled`].

use super::{Backend, BackendDirectory, BackendRegistry, Publication};
use crate::config::BackendConfig;
use crate::constants::{DEFAULT_BACKEND_TIMEOUT_SECS, OPERATOR_CONFIG_ENV};
use crate::error::{Error, Result};
use crate::observability::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use zeroize::Zeroizing;

#[derive(Debug)]
pub struct BackendManager {
    registry: BackendRegistry,
    directory: BackendDirectory,
    timeout: Duration,
}

impl BackendManager {
    #[must_use]
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            directory: BackendDirectory::new(),
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        }
    }

    /// Bound every adapter `init`/`get` call by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    #[must_use]
    pub fn directory(&self) -> &BackendDirectory {
        &self.directory
    }

    /// Build an uninitialized adapter of `kind` and store it under `name`
    ///
    /// The instance answers `get` with [`Error::BackendNotInitialized`] until
    /// it is initialized; the loader entry points below never publish such an
    /// instance. An instance previously stored under `name` is replaced and
    /// closed.
    pub async fn instantiate(&self, name: &str, kind: &str) -> Result<()> {
        let instance = self.registry.build(kind)?;
        let ticket = self.directory.ticket();
        self.settle(name, ticket, instance).await;
        debug!(instance = name, kind = kind, "Instantiated backend");
        Ok(())
    }

    /// Instance registered under `name`
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Backend>> {
        self.directory.lookup(name)
    }

    /// Fetch `key` from the instance registered under `name`
    ///
    /// # Errors
    ///
    /// [`Error::BackendInstanceNotFound`] for an unknown name,
    /// [`Error::Cancelled`] on timeout, otherwise the adapter's error.
    pub async fn get(&self, name: &str, key: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let instance = self.lookup(name)?;
        self.fetch(name, instance.as_ref(), key, version).await
    }

    /// Remove and close the instance registered under `name`
    ///
    /// Returns false when no instance was registered.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = self.directory.remove(name);
        let existed = removed.is_some();
        self.retire(name, removed).await;
        existed
    }

    /// Configure `name` from the envelope in `OPERATOR_CONFIG`
    pub async fn init_from_env(&self, name: &str) -> Result<()> {
        self.init_from_env_var(name, OPERATOR_CONFIG_ENV).await
    }

    /// Configure `name` from the envelope in environment variable `var`
    ///
    /// # Errors
    ///
    /// [`Error::ConfigNotFound`] or [`Error::ConfigInvalid`] without touching
    /// the directory; otherwise as [`init_from_declaration`](Self::init_from_declaration).
    pub async fn init_from_env_var(&self, name: &str, var: &str) -> Result<()> {
        let config = BackendConfig::from_env_var(var)?;
        self.init_from_declaration(name, &config, &[]).await
    }

    /// Configure `name` from a structured envelope plus credential bytes
    ///
    /// The adapter is built and initialized before it is stored, so it only
    /// becomes reachable once `init` has succeeded. When `init` fails (or runs
    /// out of time) any instance previously stored under `name` is removed as
    /// well, leaving nothing under that name.
    ///
    /// Overlapping calls on one name resolve in start order: the instance of
    /// the call that started last stays, whichever finishes first.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBackendType`] before anything runs, [`Error::Cancelled`]
    /// on timeout, otherwise [`Error::BackendInitFailed`] wrapping the adapter
    /// error.
    pub async fn init_from_declaration(
        &self,
        name: &str,
        config: &BackendConfig,
        credentials: &[u8],
    ) -> Result<()> {
        let kind = config.backend_type.as_str();
        let instance = self.registry.build(kind)?;
        let ticket = self.directory.ticket();
        let payload = Zeroizing::new(config.credentials_payload(credentials)?);

        let start = Instant::now();
        let result = self
            .bounded(
                || format!("init of backend instance '{name}'"),
                instance.init(&config.parameters, &payload),
            )
            .instrument(info_span!("backend.init", backend = kind, instance = name))
            .await;
        metrics::record_backend_operation(
            kind,
            "init",
            outcome(&result),
            start.elapsed().as_secs_f64(),
        );

        match result {
            Ok(()) => {
                if self.settle(name, ticket, instance).await {
                    info!(instance = name, kind = kind, "Backend instance initialized");
                }
                Ok(())
            }
            Err(e) => {
                warn!(instance = name, kind = kind, error = %e, "Backend instance init failed");
                instance.close().await;
                let stale = self.directory.remove_older(name, ticket);
                self.retire(name, stale).await;
                match e {
                    Error::Cancelled { .. } => Err(e),
                    other => Err(Error::BackendInitFailed {
                        instance: name.to_string(),
                        source: Box::new(other),
                    }),
                }
            }
        }
    }

    async fn fetch(
        &self,
        name: &str,
        instance: &dyn Backend,
        key: &str,
        version: Option<&str>,
    ) -> Result<Vec<u8>> {
        let kind = instance.kind();
        let start = Instant::now();
        let result = self
            .bounded(
                || format!("get of '{key}' from backend instance '{name}'"),
                instance.get(key, version),
            )
            .instrument(info_span!(
                "backend.get",
                backend = kind,
                instance = name,
                key = key
            ))
            .await;
        metrics::record_backend_operation(
            kind,
            "get",
            outcome(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn bounded<T, F>(&self, operation: impl FnOnce() -> String, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Cancelled {
                operation: operation(),
                timeout: self.timeout,
            }),
        }
    }

    /// Publish `instance` under `ticket`; returns false when a newer operation won
    async fn settle(&self, name: &str, ticket: u64, instance: Arc<dyn Backend>) -> bool {
        match self.directory.publish(name, ticket, instance) {
            Publication::Stored(replaced) => {
                self.retire(name, replaced).await;
                true
            }
            Publication::Superseded(instance) => {
                debug!(
                    instance = name,
                    kind = instance.kind(),
                    "Newer configuration already published, discarding instance"
                );
                instance.close().await;
                false
            }
        }
    }

    /// Close an instance that left the directory and refresh the gauge
    async fn retire(&self, name: &str, instance: Option<Arc<dyn Backend>>) {
        metrics::set_backend_instances(self.directory.len());
        if let Some(instance) = instance {
            debug!(instance = name, kind = instance.kind(), "Closing replaced backend instance");
            instance.close().await;
        }
    }
}

fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.reason(),
    }
}
