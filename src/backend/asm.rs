//! # AWS Secrets Manager Backend
//!
//! Reads secret values from AWS Secrets Manager.
//!
//! Parameters (credentials may supply any of them):
//! - `region` (required)
//! - `accessKeyID` / `secretAccessKey` (optional, together): static
//!   credentials. Without them the SDK default chain is used, which covers
//!   IRSA, environment variables and profiles.
//! - `sessionToken` (optional)
//! - `endpoint` (optional): API endpoint override
//!
//! `get(key, version)` reads `SecretId=key`, `VersionId=version`.

use super::{merge_credentials, param_str, require_params, Backend, BackendFactory, Parameters};
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

pub const KIND: &str = "asm";

const REGION: &str = "region";
const ACCESS_KEY_ID: &str = "accessKeyID";
const SECRET_ACCESS_KEY: &str = "secretAccessKey";
const SESSION_TOKEN: &str = "sessionToken";
const ENDPOINT: &str = "endpoint";

#[derive(Default)]
pub struct AsmBackend {
    client: OnceLock<SecretsManagerClient>,
    region: OnceLock<String>,
}

impl std::fmt::Debug for AsmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsmBackend")
            .field("region", &self.region.get())
            .field("initialized", &self.client.get().is_some())
            .finish()
    }
}

impl AsmBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn factory() -> BackendFactory {
        Arc::new(|| Arc::new(AsmBackend::new()) as Arc<dyn Backend>)
    }

    fn static_credentials(params: &Parameters) -> Result<Option<Credentials>> {
        match (
            param_str(params, ACCESS_KEY_ID),
            param_str(params, SECRET_ACCESS_KEY),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Some(Credentials::new(
                access_key_id,
                secret_access_key,
                param_str(params, SESSION_TOKEN),
                None,
                "externalsecret-operator",
            ))),
            (Some(_), None) => Err(Error::MissingParameter(SECRET_ACCESS_KEY.to_string())),
            (None, Some(_)) => Err(Error::MissingParameter(ACCESS_KEY_ID.to_string())),
            (None, None) => Ok(None),
        }
    }
}

#[async_trait]
impl Backend for AsmBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn init(&self, parameters: &Parameters, credentials: &[u8]) -> Result<()> {
        let params = merge_credentials(parameters, credentials)?;
        require_params(&params, &[REGION])?;
        let region = param_str(&params, REGION).unwrap_or_default();
        let static_credentials = Self::static_credentials(&params)?;

        if self.client.get().is_some() {
            warn!("asm backend already initialized, keeping the first configuration");
            return Ok(());
        }

        let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));

        match static_credentials {
            Some(credentials) => {
                info!(region = %region, "Using static AWS credentials");
                builder = builder.credentials_provider(credentials);
            }
            None => {
                info!(region = %region, "No static credentials configured, using the AWS default credential chain");
            }
        }

        if let Some(endpoint) = param_str(&params, ENDPOINT) {
            debug!(endpoint = %endpoint, "Overriding AWS Secrets Manager endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        let sdk_config = builder.load().await;
        // A concurrent init may have won the race; either client is usable
        let _ = self.client.set(SecretsManagerClient::new(&sdk_config));
        let _ = self.region.set(region);
        Ok(())
    }

    async fn get(&self, key: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let client = self
            .client
            .get()
            .ok_or_else(|| Error::BackendNotInitialized(KIND.to_string()))?;

        let mut request = client.get_secret_value().secret_id(key);
        if let Some(version) = version {
            request = request.version_id(version);
        }

        let output = request.send().await.map_err(|e| {
            let not_found = e
                .as_service_error()
                .is_some_and(|se| se.is_resource_not_found_exception());
            if not_found {
                Error::secret_not_found(key, version)
            } else {
                Error::transport(KIND, format!("get '{key}'"), e)
            }
        })?;

        if let Some(value) = output.secret_string() {
            return Ok(value.as_bytes().to_vec());
        }
        if let Some(blob) = output.secret_binary() {
            return Ok(blob.as_ref().to_vec());
        }
        Err(Error::transport(
            KIND,
            format!("get '{key}'"),
            anyhow::anyhow!("secret has neither a string nor a binary value"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Parameters {
        serde_json::from_value(value).unwrap()
    }

    async fn backend_against(server: &mockito::ServerGuard) -> AsmBackend {
        // The SDK's HTTP client needs a process-level rustls provider
        let _ = rustls::crypto::ring::default_provider().install_default();

        let backend = AsmBackend::new();
        backend
            .init(
                &params(json!({"region": "eu-west-1", "endpoint": server.url()})),
                br#"{"accessKeyID": "AKIDEXAMPLE", "secretAccessKey": "wJalrXUtnFEMI"}"#,
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_init_requires_region() {
        let backend = AsmBackend::new();
        let err = backend
            .init(&params(json!({"accessKeyID": "a", "secretAccessKey": "b"})), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref name) if name == "region"));
    }

    #[tokio::test]
    async fn test_init_rejects_half_static_credentials() {
        let backend = AsmBackend::new();
        let err = backend
            .init(&params(json!({"region": "eu-west-1", "accessKeyID": "a"})), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref name) if name == "secretAccessKey"));
    }

    #[tokio::test]
    async fn test_get_before_init() {
        let backend = AsmBackend::new();
        let err = backend.get("db-password", None).await.unwrap_err();
        assert!(matches!(err, Error::BackendNotInitialized(ref kind) if kind == "asm"));
    }

    #[tokio::test]
    async fn test_get_secret_string() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "secretsmanager.GetSecretValue")
            .with_status(200)
            .with_header("content-type", "application/x-amz-json-1.1")
            .with_body(
                r#"{"ARN": "arn:aws:secretsmanager:eu-west-1:123456789012:secret:db-password-AbCdEf",
                    "Name": "db-password",
                    "SecretString": "s3cr3t",
                    "VersionId": "v1"}"#,
            )
            .create_async()
            .await;

        let backend = backend_against(&server).await;
        let value = backend.get("db-password", None).await.unwrap();

        assert_eq!(value, b"s3cr3t");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_secret_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_header("x-amz-target", "secretsmanager.GetSecretValue")
            .with_status(400)
            .with_header("content-type", "application/x-amz-json-1.1")
            .with_body(
                r#"{"__type": "ResourceNotFoundException",
                    "message": "Secrets Manager can't find the specified secret."}"#,
            )
            .create_async()
            .await;

        let backend = backend_against(&server).await;
        let err = backend.get("missing", Some("v9")).await.unwrap_err();

        assert!(matches!(
            err,
            Error::SecretNotFound { ref key, ref version } if key == "missing" && version.as_deref() == Some("v9")
        ));
    }
}
