//! # Controller
//!
//! Reconciliation driver wiring the backend core into the cluster.
//!
//! - `backend`: `ExternalSecretBackend` → named backend instance
//! - `external_secret`: `ExternalSecret` → owned `Secret`
//! - `error_policy`: per-resource Fibonacci backoff on failure
//! - `backoff`: backoff calculator

pub mod backoff;
mod backend;
mod context;
mod error_policy;
mod external_secret;

pub use backend::credentials_from_secret;
pub use context::Context;

use crate::crd::{ExternalSecret, ExternalSecretBackend};
use crate::secret::MANAGED_BY_LABEL;
use crate::constants::MANAGED_BY;
use crate::server::ServerState;
use anyhow::Context as _;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube_runtime::{controller, watcher, Controller};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Backend(#[from] crate::Error),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<kube_runtime::finalizer::Error<ReconcileError>>),

    #[error("credentials secret '{namespace}/{name}' has no key '{key}'")]
    MissingCredentialKey {
        namespace: String,
        name: String,
        key: String,
    },
}

impl ReconcileError {
    /// Stable `CamelCase` reason for status conditions
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileError::Backend(e) => e.reason(),
            ReconcileError::Kube(_) => "KubernetesError",
            ReconcileError::Finalizer(_) => "FinalizerError",
            ReconcileError::MissingCredentialKey { .. } => "MissingCredentialKey",
        }
    }
}

/// Merge-patch the status subresource of `name`
async fn patch_status<K, S>(api: &Api<K>, name: &str, status: &S) -> Result<(), ReconcileError>
where
    K: Clone + DeserializeOwned + std::fmt::Debug,
    S: Serialize,
{
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Run both controllers until a shutdown signal is received
pub async fn run(ctx: Arc<Context>, server_state: Arc<ServerState>) -> anyhow::Result<()> {
    let client = ctx.client.clone();
    let backends: Api<ExternalSecretBackend> = Api::all(client.clone());
    let external_secrets: Api<ExternalSecret> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client);

    backends
        .list(&ListParams::default().limit(1))
        .await
        .context("ExternalSecretBackend CRD is not queryable; is it installed?")?;
    external_secrets
        .list(&ListParams::default().limit(1))
        .await
        .context("ExternalSecret CRD is not queryable; is it installed?")?;

    let config =
        controller::Config::default().concurrency(ctx.config.max_concurrent_reconciliations);

    let backend_controller = Controller::new(backends, watcher::Config::default().any_semantic())
        .with_config(config.clone())
        .shutdown_on_signal()
        .run(backend::reconcile, error_policy::error_policy, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(resource = %object, "Reconciled backend"),
                Err(e) => warn!(error = %e, "Backend controller error"),
            }
        });

    let owned_secrets =
        watcher::Config::default().labels(&format!("{MANAGED_BY_LABEL}={MANAGED_BY}"));
    let secret_controller =
        Controller::new(external_secrets, watcher::Config::default().any_semantic())
            .owns(secrets, owned_secrets)
            .with_config(config)
            .shutdown_on_signal()
            .run(external_secret::reconcile, error_policy::error_policy, ctx)
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => debug!(resource = %object, "Reconciled external secret"),
                    Err(e) => warn!(error = %e, "External secret controller error"),
                }
            });

    server_state.mark_ready(true);
    info!("Controllers started");

    tokio::join!(backend_controller, secret_controller);

    server_state.mark_ready(false);
    info!("Controllers stopped");
    Ok(())
}
