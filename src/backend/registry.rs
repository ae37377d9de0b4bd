//! # Backend Type Registry
//!
//! Maps a backend kind to the factory that builds uninitialized adapters of
//! that kind.

use super::Backend;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Zero-argument constructor of an uninitialized adapter
pub type BackendFactory = Arc<dyn Fn() -> Arc<dyn Backend> + Send + Sync>;

/// Thread-safe registry of backend kinds
///
/// Registration normally happens once per adapter at bootstrap, but the
/// registry may be queried at any time: an unknown kind is a
/// [`Error::UnknownBackendType`], never a panic.
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `kind`
    ///
    /// A second registration of the same kind replaces the first. Returns true
    /// when a previous factory was replaced.
    pub fn register(&self, kind: &str, factory: BackendFactory) -> bool {
        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.to_string(), factory)
            .is_some();

        if replaced {
            warn!(kind = kind, "Backend type re-registered, previous factory replaced");
        } else {
            info!(kind = kind, "Registered backend type");
        }
        replaced
    }

    /// Look up the factory registered for `kind`
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBackendType`] when nothing is registered under `kind`.
    pub fn resolve(&self, kind: &str) -> Result<BackendFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::UnknownBackendType(kind.to_string()))
    }

    /// Resolve `kind` and build a fresh, uninitialized adapter
    pub fn build(&self, kind: &str) -> Result<Arc<dyn Backend>> {
        // Lock is released before the factory runs
        let factory = self.resolve(kind)?;
        Ok(factory())
    }

    /// Registered kinds, sorted
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        kinds.sort();
        kinds
    }
}
