//! # `ExternalSecret` Reconciler
//!
//! Materializes the referenced value and server-side applies the resulting
//! `Secret`. The secret is owned by the `ExternalSecret`, so deletion is left
//! to the garbage collector.

use super::backoff::ResourceBackoffs;
use super::{patch_status, Context, ReconcileError};
use crate::constants::FIELD_MANAGER;
use crate::crd::{Condition, ExternalSecret, ExternalSecretStatus};
use crate::observability::metrics;
use crate::secret::{materialize, SecretReference};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

const KIND: &str = "ExternalSecret";

pub(super) async fn reconcile(
    es: Arc<ExternalSecret>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    if release_if_deleted(&es, &ctx.backoffs) {
        debug!(resource = %es.name_any(), "ExternalSecret is being deleted, nothing to sync");
        return Ok(Action::await_change());
    }

    let span = info_span!(
        "reconcile.external_secret",
        resource.name = %es.name_any(),
        resource.namespace = %es.namespace().unwrap_or_default(),
        backend = %es.spec.backend
    );

    let start = Instant::now();
    metrics::increment_reconciliations(KIND);

    let result = sync(&es, &ctx).instrument(span).await;

    metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());
    result
}

async fn sync(es: &ExternalSecret, ctx: &Context) -> Result<Action, ReconcileError> {
    let reference = SecretReference::for_external_secret(es)?;
    let api: Api<ExternalSecret> = Api::namespaced(ctx.client.clone(), &reference.namespace);
    let previous = es
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();

    let result = apply_secret(ctx, &reference).await;

    let status = match &result {
        Ok(()) => ExternalSecretStatus {
            conditions: vec![Condition::ready(
                true,
                "Synced",
                format!(
                    "secret '{}' synced from backend instance '{}'",
                    reference.name, reference.backend
                ),
            )
            .since(previous)],
            observed_generation: es.metadata.generation,
            last_sync_time: Some(chrono::Utc::now().to_rfc3339()),
        },
        Err(e) => ExternalSecretStatus {
            conditions: vec![Condition::ready(false, e.reason(), e.to_string()).since(previous)],
            observed_generation: es.metadata.generation,
            last_sync_time: es.status.as_ref().and_then(|s| s.last_sync_time.clone()),
        },
    };
    match patch_status(&api, &reference.name, &status).await {
        Err(e) if is_not_found(&e) => {
            ctx.backoffs.reset(&super::error_policy::resource_key(es));
            debug!(resource = %reference.name, "ExternalSecret is gone, dropping its state");
            return Ok(Action::await_change());
        }
        patched => patched?,
    }

    result?;
    if ctx.backoffs.reset(&super::error_policy::resource_key(es)) {
        info!(secret = %reference.name, "Backoff reset after successful sync");
    }
    Ok(Action::requeue(ctx.config.resync_interval()))
}

/// Forget the backoff of a resource that is being deleted
///
/// Returns true when the resource has a deletion timestamp; the owned
/// `Secret` is left to the garbage collector.
fn release_if_deleted(es: &ExternalSecret, backoffs: &ResourceBackoffs) -> bool {
    if es.metadata.deletion_timestamp.is_none() {
        return false;
    }
    backoffs.reset(&super::error_policy::resource_key(es));
    true
}

fn is_not_found(error: &ReconcileError) -> bool {
    matches!(error, ReconcileError::Kube(kube::Error::Api(api_err)) if api_err.code == 404)
}

async fn apply_secret(ctx: &Context, reference: &SecretReference) -> Result<(), ReconcileError> {
    let secret = materialize(&ctx.backends, reference).await?;

    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &reference.namespace);
    secrets
        .patch(
            &reference.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;
    Ok(())
}
