//! # Backend Instance Directory
//!
//! Named, live adapter instances consulted at materialization time.
//!
//! Every write is tagged with a ticket drawn when the operation started. A
//! name keeps the instance of the most recently started operation, so a slow
//! older `init` can neither overwrite nor remove what a newer one published.

use super::Backend;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

struct Slot {
    ticket: u64,
    instance: Arc<dyn Backend>,
}

/// Outcome of [`BackendDirectory::publish`]
#[derive(Debug)]
pub enum Publication {
    /// Stored; carries the instance it replaced, if any
    Stored(Option<Arc<dyn Backend>>),
    /// A newer operation already owns the name; the instance is handed back
    Superseded(Arc<dyn Backend>),
}

/// Thread-safe map from instance name to adapter
///
/// The directory is the owner of every instance. [`lookup`](Self::lookup) hands
/// out a clone of the `Arc` for the duration of one call; callers must not
/// keep it beyond that call. Replaced and removed instances are returned to
/// the caller so it can close them outside the lock.
#[derive(Default)]
pub struct BackendDirectory {
    instances: RwLock<HashMap<String, Slot>>,
    tickets: AtomicU64,
}

impl std::fmt::Debug for BackendDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDirectory")
            .field("instances", &self.names())
            .finish()
    }
}

impl BackendDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the ticket of an operation that is about to write `name`
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Store `instance` under `name` unless a newer ticket already owns it
    pub fn publish(&self, name: &str, ticket: u64, instance: Arc<dyn Backend>) -> Publication {
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        if instances.get(name).is_some_and(|slot| slot.ticket > ticket) {
            return Publication::Superseded(instance);
        }
        let replaced = instances.insert(name.to_string(), Slot { ticket, instance });
        Publication::Stored(replaced.map(|slot| slot.instance))
    }

    /// Store `instance` under `name` with a fresh ticket, returning the instance it replaced
    pub fn insert(&self, name: &str, instance: Arc<dyn Backend>) -> Option<Arc<dyn Backend>> {
        match self.publish(name, self.ticket(), instance) {
            Publication::Stored(replaced) => replaced,
            // A fresh ticket is the newest one
            Publication::Superseded(_) => None,
        }
    }

    /// Instance registered under `name`
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Backend>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|slot| Arc::clone(&slot.instance))
            .ok_or_else(|| Error::BackendInstanceNotFound(name.to_string()))
    }

    /// Remove the instance registered under `name`
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .map(|slot| slot.instance)
    }

    /// Remove the instance under `name` only if it was stored before `ticket`
    pub fn remove_older(&self, name: &str, ticket: u64) -> Option<Arc<dyn Backend>> {
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        if instances.get(name)?.ticket >= ticket {
            return None;
        }
        instances.remove(name).map(|slot| slot.instance)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instance names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
