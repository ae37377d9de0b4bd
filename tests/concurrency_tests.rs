//! # Concurrency Tests
//!
//! The manager is shared by every reconciliation; these tests drive it from
//! many tasks at once.

mod common;

use externalsecret_operator::config::BackendConfig;
use externalsecret_operator::Error;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

const INSTANCES: usize = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_declarations_on_distinct_names() {
    let manager = Arc::new(common::manager());

    let tasks = (0..INSTANCES).map(|i| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let name = format!("backend-{i}");
            let config = BackendConfig::new("dummy").with_parameter("suffix", format!("-{i}"));
            if i % 2 == 0 {
                manager
                    .instantiate(&format!("{name}-raw"), "dummy")
                    .await
                    .unwrap();
            }
            manager.init_from_declaration(&name, &config, &[]).await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(manager.directory().len(), INSTANCES + INSTANCES / 2);
    for i in 0..INSTANCES {
        let value = manager
            .get(&format!("backend-{i}"), "key", None)
            .await
            .unwrap();
        assert_eq!(value, format!("key-{i}").into_bytes());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_gets_on_one_instance() {
    let manager = Arc::new(common::manager());
    manager
        .init_from_declaration(
            "shared",
            &BackendConfig::new("dummy").with_parameter("suffix", "-shared"),
            &[],
        )
        .await
        .unwrap();

    let tasks = (0..INSTANCES).map(|i| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.get("shared", &format!("key-{i}"), None).await })
    });

    for (i, result) in join_all(tasks).await.into_iter().enumerate() {
        assert_eq!(
            result.unwrap().unwrap(),
            format!("key-{i}-shared").into_bytes()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_get_does_not_block_other_instances() {
    let manager = Arc::new(common::manager().with_timeout(Duration::from_secs(2)));
    manager.registry().register(
        common::SLOW_KIND,
        common::SlowBackend::factory(Duration::from_millis(500)),
    );
    manager.instantiate("slow", common::SLOW_KIND).await.unwrap();
    manager
        .init_from_declaration("fast", &BackendConfig::new("dummy"), &[])
        .await
        .unwrap();

    let slow = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.get("slow", "key", None).await })
    };

    // Registry and directory locks are not held while the slow call sleeps
    let fast = tokio::time::timeout(Duration::from_millis(200), manager.get("fast", "key", None))
        .await
        .expect("fast instance blocked behind slow one");
    assert_eq!(fast.unwrap(), b"key");
    manager.instantiate("other", "dummy").await.unwrap();

    assert_eq!(slow.await.unwrap().unwrap(), b"key");
}

#[tokio::test]
async fn test_init_timeout_is_cancelled_and_not_published() {
    let manager = common::manager().with_timeout(Duration::from_millis(50));
    manager.registry().register(
        common::SLOW_KIND,
        common::SlowBackend::factory(Duration::from_secs(5)),
    );

    let err = manager
        .init_from_declaration("slow", &BackendConfig::new(common::SLOW_KIND), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }));
    assert!(!manager.directory().contains("slow"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_older_failed_init_keeps_newer_instance() {
    let manager = Arc::new(common::manager());
    manager.registry().register(
        common::FAILING_KIND,
        common::FailingBackend::factory(Duration::from_millis(200)),
    );

    let older = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .init_from_declaration("shared", &BackendConfig::new(common::FAILING_KIND), &[])
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let newer = BackendConfig::new("dummy").with_parameter("suffix", "-newer");
    manager
        .init_from_declaration("shared", &newer, &[])
        .await
        .unwrap();

    let err = older.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::BackendInitFailed { .. }));

    assert_eq!(
        manager.get("shared", "key", None).await.unwrap(),
        b"key-newer"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_older_slow_init_does_not_overwrite_newer_instance() {
    let manager = Arc::new(common::manager());
    manager.registry().register(
        common::SLOW_KIND,
        common::SlowBackend::factory(Duration::from_millis(200)),
    );

    let older = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .init_from_declaration("shared", &BackendConfig::new(common::SLOW_KIND), &[])
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    manager
        .init_from_declaration("shared", &BackendConfig::new("dummy"), &[])
        .await
        .unwrap();
    older.await.unwrap().unwrap();

    assert_eq!(manager.lookup("shared").unwrap().kind(), "dummy");
    assert_eq!(manager.directory().len(), 1);
}
