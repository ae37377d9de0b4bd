//! # `ExternalSecretBackend` Reconciler
//!
//! Keeps the backend instance directory in step with `ExternalSecretBackend`
//! resources: apply configures the instance named after the resource, delete
//! removes it. A finalizer guarantees the removal runs.

use super::{patch_status, Context, ReconcileError};
use crate::config::BackendConfig;
use crate::constants::BACKEND_FINALIZER;
use crate::crd::{
    Condition, ExternalSecretBackend, ExternalSecretBackendStatus, SecretKeyRef, READY,
};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use zeroize::Zeroizing;

const KIND: &str = "ExternalSecretBackend";

pub(super) async fn reconcile(
    esb: Arc<ExternalSecretBackend>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = esb.name_any();
    let start = Instant::now();
    metrics::increment_reconciliations(KIND);

    let api: Api<ExternalSecretBackend> = Api::all(ctx.client.clone());
    let result = finalizer(&api, BACKEND_FINALIZER, esb, |event| async move {
        match event {
            Event::Apply(esb) => apply(esb, ctx).await,
            Event::Cleanup(esb) => cleanup(esb, ctx).await,
        }
    })
    .instrument(info_span!("reconcile.backend", resource.name = %name))
    .await
    .map_err(|e| ReconcileError::Finalizer(Box::new(e)));

    metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());
    result
}

/// Whether the instance already reflects the current generation
fn is_current(esb: &ExternalSecretBackend) -> bool {
    esb.status.as_ref().is_some_and(|status| {
        status.observed_generation == esb.metadata.generation
            && status
                .conditions
                .iter()
                .any(|c| c.r#type == READY && c.status == "True")
    })
}

async fn apply(
    esb: Arc<ExternalSecretBackend>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = esb.name_any();
    let key = super::error_policy::resource_key(esb.as_ref());

    if is_current(&esb) && ctx.backends.directory().contains(&name) {
        debug!(instance = %name, "Backend instance is up to date");
        return Ok(Action::await_change());
    }

    let result = initialize(&esb, &ctx).await;

    let previous = esb
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    let condition = match &result {
        Ok(()) => Condition::ready(
            true,
            "Initialized",
            format!(
                "backend instance '{name}' of type '{}' is ready",
                esb.spec.backend_type
            ),
        ),
        Err(e) => Condition::ready(false, e.reason(), e.to_string()),
    }
    .since(previous);
    let status = ExternalSecretBackendStatus {
        conditions: vec![condition],
        observed_generation: esb.metadata.generation,
    };

    let api: Api<ExternalSecretBackend> = Api::all(ctx.client.clone());
    patch_status(&api, &name, &status).await?;

    result?;
    if ctx.backoffs.reset(&key) {
        info!(instance = %name, "Backoff reset after successful initialization");
    }
    Ok(Action::await_change())
}

async fn initialize(esb: &ExternalSecretBackend, ctx: &Context) -> Result<(), ReconcileError> {
    let credentials = match &esb.spec.credentials_secret_ref {
        Some(secret_ref) => read_credentials(&ctx.client, secret_ref).await?,
        None => Zeroizing::new(Vec::new()),
    };

    let config = BackendConfig::from(&esb.spec);
    ctx.backends
        .init_from_declaration(&esb.name_any(), &config, &credentials)
        .await?;
    Ok(())
}

async fn cleanup(
    esb: Arc<ExternalSecretBackend>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = esb.name_any();
    if ctx.backends.remove(&name).await {
        info!(instance = %name, "Removed backend instance");
    } else {
        debug!(instance = %name, "No backend instance to remove");
    }
    ctx.backoffs
        .reset(&super::error_policy::resource_key(esb.as_ref()));
    Ok(Action::await_change())
}

async fn read_credentials(
    client: &Client,
    secret_ref: &SecretKeyRef,
) -> Result<Zeroizing<Vec<u8>>, ReconcileError> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &secret_ref.namespace);
    let secret = secrets.get(&secret_ref.name).await?;
    credentials_from_secret(&secret, secret_ref)
}

/// Credential bytes stored under `secret_ref.key`
///
/// Looks in `data` first, then `stringData`.
pub fn credentials_from_secret(
    secret: &Secret,
    secret_ref: &SecretKeyRef,
) -> Result<Zeroizing<Vec<u8>>, ReconcileError> {
    let from_data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&secret_ref.key))
        .map(|value| value.0.clone());
    let from_string_data = || {
        secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(&secret_ref.key))
            .map(|value| value.as_bytes().to_vec())
    };

    from_data
        .or_else(from_string_data)
        .map(Zeroizing::new)
        .ok_or_else(|| ReconcileError::MissingCredentialKey {
            namespace: secret_ref.namespace.clone(),
            name: secret_ref.name.clone(),
            key: secret_ref.key.clone(),
        })
}
