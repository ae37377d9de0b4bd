//! # Secret Materialization Tests
//!
//! End-to-end from an `ExternalSecret` to the `Secret` the operator would
//! apply, using the dummy backend.

mod common;

use externalsecret_operator::config::BackendConfig;
use externalsecret_operator::secret::{materialize, SecretReference, MANAGED_BY_LABEL};
use externalsecret_operator::Error;
use k8s_openapi::ByteString;
use std::time::Duration;

#[tokio::test]
async fn test_materialize_dummy_round_trip() {
    let manager = common::manager();
    let config = BackendConfig::new("dummy").with_parameter("suffix", "-value");
    manager
        .init_from_declaration("dummy-backend", &config, &[])
        .await
        .unwrap();

    let es = common::external_secret("apps", "6f1d-uid", "dummy-backend", "this");
    let reference = SecretReference::for_external_secret(&es).unwrap();
    let secret = materialize(&manager, &reference).await.unwrap();

    let data = secret.data.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data["this"], ByteString(b"this-value".to_vec()));

    let owners = secret.metadata.owner_references.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "ExternalSecret");
    assert_eq!(owners[0].name, "app-credentials");
    assert_eq!(owners[0].uid, "6f1d-uid");
    assert_eq!(owners[0].controller, Some(true));

    assert_eq!(secret.metadata.name.as_deref(), Some("app-credentials"));
    assert_eq!(secret.metadata.namespace.as_deref(), Some("apps"));
    assert!(secret.metadata.labels.unwrap().contains_key(MANAGED_BY_LABEL));
}

#[tokio::test]
async fn test_materialize_unknown_backend_instance() {
    let manager = common::manager();

    let es = common::external_secret("apps", "uid", "missing-backend", "key");
    let reference = SecretReference::for_external_secret(&es).unwrap();
    let err = materialize(&manager, &reference).await.unwrap_err();

    assert!(matches!(err, Error::BackendInstanceNotFound(ref name) if name == "missing-backend"));
}

#[tokio::test]
async fn test_materialize_fetch_failure_builds_no_secret() {
    let manager = common::manager();
    // Instantiated but never initialized, so every fetch fails
    manager.instantiate("dummy-backend", "dummy").await.unwrap();

    let es = common::external_secret("apps", "uid", "dummy-backend", "key");
    let reference = SecretReference::for_external_secret(&es).unwrap();
    let err = materialize(&manager, &reference).await.unwrap_err();

    match err {
        Error::SecretFetchFailed {
            instance,
            key,
            source,
        } => {
            assert_eq!(instance, "dummy-backend");
            assert_eq!(key, "key");
            assert!(matches!(*source, Error::BackendNotInitialized(_)));
        }
        other => panic!("expected SecretFetchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_materialize_slow_backend_is_cancelled() {
    let manager = common::manager().with_timeout(Duration::from_millis(50));
    manager.registry().register(
        common::SLOW_KIND,
        common::SlowBackend::factory(Duration::from_secs(5)),
    );
    manager
        .instantiate("slower", common::SLOW_KIND)
        .await
        .unwrap();

    let es = common::external_secret("apps", "uid", "slower", "key");
    let reference = SecretReference::for_external_secret(&es).unwrap();
    let err = materialize(&manager, &reference).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled { timeout, .. } if timeout == Duration::from_millis(50)));
    assert_eq!(err.reason(), "Cancelled");
}
