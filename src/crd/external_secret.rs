//! # `ExternalSecret`
//!
//! Asks the operator to materialize one value from a backend instance into a
//! `Secret` of the same name and namespace, owned by this resource.

use super::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// External secret request
///
/// # Example
///
/// ```yaml
/// apiVersion: externalsecret-operator.container-solutions.com/v1alpha1
/// kind: ExternalSecret
/// metadata:
///   name: db-password
///   namespace: default
/// spec:
///   backend: asm-prod
///   key: prod/db-password
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ExternalSecret",
    group = "externalsecret-operator.container-solutions.com",
    version = "v1alpha1",
    namespaced,
    status = "ExternalSecretStatus",
    shortname = "es",
    printcolumn = r#"{"name":"Backend", "type":"string", "jsonPath":".spec.backend"}, {"name":"Key", "type":"string", "jsonPath":".spec.key"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretSpec {
    /// Backend instance name (an `ExternalSecretBackend` or the bootstrap instance)
    pub backend: String,
    /// Key in the backing store
    pub key: String,
    /// Optional backend-specific version
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last successful materialization (RFC3339)
    #[serde(default)]
    pub last_sync_time: Option<String>,
}
