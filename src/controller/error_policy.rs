//! # Error Policy
//!
//! Requeues failed reconciliations with a per-resource Fibonacci backoff, so
//! one failing resource never delays the others.

use super::{Context, ReconcileError};
use crate::observability::metrics;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Backoff key of a resource: `kind/namespace/name`
pub(super) fn resource_key<K>(obj: &K) -> String
where
    K: Resource<DynamicType = ()>,
{
    format!(
        "{}/{}/{}",
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

pub(super) fn error_policy<K>(obj: Arc<K>, error: &ReconcileError, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let key = resource_key(obj.as_ref());
    metrics::increment_reconciliation_errors(&kind);

    let (delay, error_count) = ctx.backoffs.next(&key);
    error!(
        resource = %key,
        reason = error.reason(),
        error = %error,
        "Reconciliation failed"
    );
    info!(
        resource = %key,
        error_count = error_count,
        retry_in_secs = delay.as_secs(),
        "Retrying with Fibonacci backoff"
    );

    Action::requeue(delay)
}
