//! # Backend Registry and Directory Tests
//!
//! These tests verify:
//! - Every built-in kind can be instantiated and looked up by name
//! - Unknown kinds and names fail without touching the directory
//! - Adapters refuse to serve before `init`
//! - Adapters report the first missing required parameter

mod common;

use externalsecret_operator::backend::{self, Parameters};
use externalsecret_operator::Error;
use serde_json::json;

#[tokio::test]
async fn test_instantiate_every_builtin_kind() {
    let manager = common::manager();

    for kind in ["dummy", "asm", "onepassword", "vault"] {
        let name = format!("{kind}-instance");
        manager.instantiate(&name, kind).await.unwrap();

        let instance = manager.lookup(&name).unwrap();
        assert_eq!(instance.kind(), kind, "instance '{name}' has the wrong kind");
    }

    assert_eq!(manager.directory().len(), 4);
}

#[tokio::test]
async fn test_registry_lists_builtin_kinds() {
    let manager = common::manager();
    assert_eq!(
        manager.registry().kinds(),
        vec!["asm", "dummy", "onepassword", "vault"]
    );
}

#[tokio::test]
async fn test_unknown_kind_leaves_directory_unchanged() {
    let manager = common::manager();
    manager.instantiate("kept", "dummy").await.unwrap();

    let err = manager.instantiate("new", "gcp").await.unwrap_err();
    assert!(matches!(err, Error::UnknownBackendType(ref kind) if kind == "gcp"));

    assert_eq!(manager.directory().names(), vec!["kept"]);
    assert!(matches!(
        manager.lookup("new").unwrap_err(),
        Error::BackendInstanceNotFound(_)
    ));
}

#[tokio::test]
async fn test_unknown_instance_name() {
    let manager = common::manager();

    let err = manager.get("nowhere", "key", None).await.unwrap_err();
    assert!(matches!(err, Error::BackendInstanceNotFound(ref name) if name == "nowhere"));
}

#[tokio::test]
async fn test_get_before_init() {
    let manager = common::manager();

    for kind in ["dummy", "asm", "onepassword", "vault"] {
        manager.instantiate(kind, kind).await.unwrap();
        let err = manager.get(kind, "some-key", None).await.unwrap_err();
        assert!(
            matches!(err, Error::BackendNotInitialized(_)),
            "{kind}: expected BackendNotInitialized, got {err:?}"
        );
    }
}

#[tokio::test]
async fn test_missing_parameters_are_named() {
    let manager = common::manager();
    let cases = [
        ("asm", json!({}), "region"),
        ("asm", json!({"region": "eu-west-1", "accessKeyID": "AKIA"}), "secretAccessKey"),
        ("onepassword", json!({}), "domain"),
        ("onepassword", json!({"domain": "https://team.1password.com"}), "email"),
        ("vault", json!({}), "address"),
        ("vault", json!({"address": "http://vault:8200"}), "token"),
    ];

    for (kind, parameters, missing) in cases {
        let parameters: Parameters = serde_json::from_value(parameters).unwrap();
        let adapter = manager.registry().build(kind).unwrap();

        let err = adapter.init(&parameters, &[]).await.unwrap_err();
        assert!(
            matches!(err, Error::MissingParameter(ref name) if name == missing),
            "{kind}: expected missing '{missing}', got {err:?}"
        );
    }
}

#[tokio::test]
async fn test_reregistration_replaces_factory() {
    let manager = common::manager();

    let replaced = manager
        .registry()
        .register("dummy", backend::dummy::DummyBackend::factory());
    assert!(replaced);

    let added = manager
        .registry()
        .register("dummy-copy", backend::dummy::DummyBackend::factory());
    assert!(!added);
    assert_eq!(manager.registry().kinds().len(), 5);
}

#[tokio::test]
async fn test_reinstantiate_replaces_instance() {
    let manager = common::manager();
    manager.instantiate("shared", "dummy").await.unwrap();
    manager.instantiate("shared", "vault").await.unwrap();

    assert_eq!(manager.lookup("shared").unwrap().kind(), "vault");
    assert_eq!(manager.directory().len(), 1);

    assert!(manager.remove("shared").await);
    assert!(!manager.remove("shared").await);
    assert!(manager.directory().is_empty());
}
