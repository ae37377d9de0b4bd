//! # `ExternalSecretBackend`
//!
//! Declares one named backend instance. The instance name is the resource's
//! `metadata.name`, which is why the resource is cluster-scoped.

use super::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend instance declaration
///
/// # Example
///
/// ```yaml
/// apiVersion: externalsecret-operator.container-solutions.com/v1alpha1
/// kind: ExternalSecretBackend
/// metadata:
///   name: asm-prod
/// spec:
///   type: asm
///   parameters:
///     region: eu-west-1
///   credentialsSecretRef:
///     name: asm-credentials
///     namespace: externalsecret-operator
///     key: credentials.json
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ExternalSecretBackend",
    group = "externalsecret-operator.container-solutions.com",
    version = "v1alpha1",
    status = "ExternalSecretBackendStatus",
    shortname = "esb",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretBackendSpec {
    /// Registered backend kind (dummy, asm, onepassword, vault)
    #[serde(rename = "type")]
    pub backend_type: String,
    /// Adapter parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Inline credentials, used when no credentials secret is referenced
    #[serde(default)]
    pub auth: BTreeMap<String, String>,
    /// Secret key holding the credentials payload
    #[serde(default)]
    pub credentials_secret_ref: Option<SecretKeyRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
    pub namespace: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretBackendStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_type_field() {
        let spec: ExternalSecretBackendSpec = serde_json::from_value(serde_json::json!({
            "type": "vault",
            "parameters": {"address": "http://vault:8200"},
            "credentialsSecretRef": {"name": "vault", "namespace": "ops", "key": "token.json"}
        }))
        .unwrap();

        assert_eq!(spec.backend_type, "vault");
        assert_eq!(spec.parameters["address"], "http://vault:8200");
        assert!(spec.auth.is_empty());
        assert_eq!(spec.credentials_secret_ref.unwrap().key, "token.json");
    }
}
