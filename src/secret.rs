//! # Secret Materializer
//!
//! Resolves a [`SecretReference`] into a `Secret` that carries the fetched
//! value and a controller owner reference back to the requesting resource, so
//! deleting the resource cascades to the secret.
//!
//! A failed fetch fails the whole operation; no partially filled secret is
//! ever built.

use crate::backend::BackendManager;
use crate::constants::MANAGED_BY;
use crate::crd::ExternalSecret;
use crate::error::{Error, Result};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Label marking secrets written by the operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Everything needed to materialize one secret
#[derive(Debug, Clone, PartialEq)]
pub struct SecretReference {
    /// Name of the requesting resource, reused for the secret
    pub name: String,
    pub namespace: String,
    /// Backend instance to query
    pub backend: String,
    pub key: String,
    pub version: Option<String>,
    /// Controller owner reference to the requesting resource
    pub owner: OwnerReference,
}

impl SecretReference {
    /// Build the reference for an `ExternalSecret`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidResource`] when the resource has no namespace or UID,
    /// since the secret could not be placed or owned.
    pub fn for_external_secret(es: &ExternalSecret) -> Result<Self> {
        let name = es.name_any();
        let invalid = |reason: &str| Error::InvalidResource {
            name: name.clone(),
            reason: reason.to_string(),
        };

        let namespace = es.namespace().ok_or_else(|| invalid("missing namespace"))?;
        let owner = es
            .controller_owner_ref(&())
            .ok_or_else(|| invalid("missing uid"))?;

        Ok(Self {
            name: name.clone(),
            namespace,
            backend: es.spec.backend.clone(),
            key: es.spec.key.clone(),
            version: es.spec.version.clone(),
            owner,
        })
    }
}

/// Fetch the referenced value and wrap it in an owned `Secret`
///
/// # Errors
///
/// - [`Error::BackendInstanceNotFound`] when the backend name is unknown.
/// - [`Error::Cancelled`] when the fetch exceeded the manager's timeout.
/// - [`Error::SecretFetchFailed`] wrapping any other adapter error.
pub async fn materialize(backends: &BackendManager, reference: &SecretReference) -> Result<Secret> {
    debug!(
        backend = %reference.backend,
        key = %reference.key,
        "Fetching secret value"
    );

    let value = backends
        .get(&reference.backend, &reference.key, reference.version.as_deref())
        .await
        .map_err(|e| match e {
            Error::BackendInstanceNotFound(_) | Error::Cancelled { .. } => e,
            other => Error::SecretFetchFailed {
                instance: reference.backend.clone(),
                key: reference.key.clone(),
                source: Box::new(other),
            },
        })?;

    let secret = build_secret(reference, value);
    metrics::increment_secrets_materialized();
    info!(
        secret = %reference.name,
        namespace = %reference.namespace,
        backend = %reference.backend,
        "Materialized secret"
    );
    Ok(secret)
}

fn build_secret(reference: &SecretReference, value: Vec<u8>) -> Secret {
    let mut owner = reference.owner.clone();
    owner.block_owner_deletion = Some(true);

    Secret {
        metadata: ObjectMeta {
            name: Some(reference.name.clone()),
            namespace: Some(reference.namespace.clone()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY.to_string(),
            )])),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            reference.key.clone(),
            ByteString(value),
        )])),
        ..Secret::default()
    }
}
