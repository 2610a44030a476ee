//! End-to-end session tests: real directories, real polling loops, the
//! in-memory store standing in for the database.


use freqsync_watch::{SessionConfig, SessionRegistry, WatchError, WatchMode};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::{wait_until, MemoryStore};

const TICK: Duration = Duration::from_secs(1);
const PATIENCE: Duration = Duration::from_secs(5);

fn registry_with_store() -> (Arc<MemoryStore>, SessionRegistry) {
    let store = Arc::new(MemoryStore::new());
    let registry = SessionRegistry::new(store.clone(), "frequency");
    (store, registry)
}

#[tokio::test]
async fn test_session_round_trip() {
    test_helpers::init_tracing();
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("044.800")).unwrap();

    let (store, registry) = registry_with_store();
    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();

    assert!(registry.is_running("main").await);
    assert!(
        wait_until(PATIENCE, || store.keys_under("frequency/main").len() == 1).await,
        "record for the initial folder never appeared"
    );

    let keys = store.keys_under("frequency/main");
    let record = store.node(&keys[0]).unwrap();
    assert_eq!(record["frequency"], "044.800");

    // a new folder appears
    fs::create_dir(temp.path().join("045.100")).unwrap();
    assert!(
        wait_until(PATIENCE, || store.keys_under("frequency/main").len() == 2).await,
        "record for the new folder never appeared"
    );

    // and the first one goes away
    fs::remove_dir(temp.path().join("044.800")).unwrap();
    assert!(
        wait_until(PATIENCE, || {
            let keys = store.keys_under("frequency/main");
            keys.len() == 1 && store.node(&keys[0]).unwrap()["frequency"] == "045.100"
        })
        .await,
        "record for the removed folder was not deleted"
    );

    assert!(registry.stop("main").await);
    assert!(!registry.is_running("main").await);
}

#[tokio::test]
async fn test_duplicate_session_name_rejected() {
    let temp = TempDir::new().unwrap();
    let (_store, registry) = registry_with_store();

    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();

    let result = registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await;
    assert!(matches!(result, Err(WatchError::DuplicateSession(name)) if name == "main"));

    registry.stop_all().await;
}

#[tokio::test]
async fn test_name_reusable_after_stop() {
    let temp = TempDir::new().unwrap();
    let (_store, registry) = registry_with_store();

    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();
    registry.stop("main").await;

    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();
    assert!(registry.is_running("main").await);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_stop_unknown_session_is_a_noop() {
    let (_store, registry) = registry_with_store();
    assert!(!registry.stop("ghost").await);
}

#[tokio::test]
async fn test_remove_deletes_the_namespace() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("044.800")).unwrap();

    let (store, registry) = registry_with_store();
    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();
    assert!(wait_until(PATIENCE, || !store.keys_under("frequency/main").is_empty()).await);

    registry.remove("main").await.unwrap();

    assert!(!registry.is_running("main").await);
    assert!(store.keys_under("frequency/main").is_empty());
}

#[tokio::test]
async fn test_concurrent_sessions_keep_disjoint_namespaces() {
    let temp_a = TempDir::new().unwrap();
    let temp_b = TempDir::new().unwrap();
    fs::create_dir(temp_a.path().join("044.800")).unwrap();
    fs::create_dir(temp_b.path().join("045.100")).unwrap();
    fs::create_dir(temp_b.path().join("046.200")).unwrap();

    let (store, registry) = registry_with_store();
    registry
        .create(SessionConfig::new("alpha", temp_a.path(), TICK))
        .await
        .unwrap();
    registry
        .create(SessionConfig::new("beta", temp_b.path(), Duration::from_secs(2)))
        .await
        .unwrap();

    assert!(
        wait_until(PATIENCE, || {
            store.keys_under("frequency/alpha").len() == 1
                && store.keys_under("frequency/beta").len() == 2
        })
        .await
    );

    // interleave some more ticks, then verify prefix isolation
    fs::create_dir(temp_a.path().join("047.300")).unwrap();
    assert!(wait_until(PATIENCE, || store.keys_under("frequency/alpha").len() == 2).await);

    for key in store.keys_under("frequency/alpha") {
        assert!(key.starts_with("frequency/alpha/"));
    }
    let beta_records: Vec<String> = store
        .keys_under("frequency/beta")
        .iter()
        .map(|k| store.node(k).unwrap()["frequency"].as_str().unwrap().to_string())
        .collect();
    assert!(!beta_records.contains(&"044.800".to_string()));
    assert!(!beta_records.contains(&"047.300".to_string()));

    registry.stop_all().await;
    assert!(!registry.is_running("alpha").await);
    assert!(!registry.is_running("beta").await);
}

#[tokio::test]
async fn test_restart_adopts_existing_records_without_duplicating() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("044.800")).unwrap();

    let (store, registry) = registry_with_store();
    store.seed(
        "frequency/main/surviving-key",
        json!({
            "frequency": "044.800",
            "name": "044.800",
            "path": temp.path().join("044.800").display().to_string(),
            "status": "active",
            "created_at": 1700000000,
            "updated_at": 1700000000,
        }),
    );

    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();

    // wait for at least one full pass
    assert!(wait_for_a_pass(&registry, PATIENCE).await);

    let keys = store.keys_under("frequency/main");
    assert_eq!(keys, vec!["frequency/main/surviving-key".to_string()]);

    registry.stop_all().await;
}

#[tokio::test]
async fn test_adoption_deletes_stale_records() {
    let temp = TempDir::new().unwrap();

    let (store, registry) = registry_with_store();
    store.seed(
        "frequency/main/stale-key",
        json!({
            "frequency": "099.900",
            "name": "099.900",
            "path": temp.path().join("099.900").display().to_string(),
            "status": "active",
            "created_at": 1700000000,
            "updated_at": 1700000000,
        }),
    );

    registry
        .create(SessionConfig::new("main", temp.path(), TICK))
        .await
        .unwrap();

    assert!(
        wait_until(PATIENCE, || store.keys_under("frequency/main").is_empty()).await,
        "stale record survived adoption"
    );

    registry.stop_all().await;
}

#[tokio::test]
async fn test_ignore_preexisting_entries() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("044.800")).unwrap();

    let (store, registry) = registry_with_store();
    registry
        .create(
            SessionConfig::new("main", temp.path(), TICK).with_ignore_preexisting(true),
        )
        .await
        .unwrap();

    assert!(wait_for_a_pass(&registry, PATIENCE).await);
    assert!(
        store.keys_under("frequency/main").is_empty(),
        "pre-existing folder must never be mirrored"
    );

    fs::create_dir(temp.path().join("045.100")).unwrap();
    assert!(
        wait_until(PATIENCE, || store.keys_under("frequency/main").len() == 1).await,
        "folder created after start must be mirrored"
    );
    let keys = store.keys_under("frequency/main");
    assert_eq!(store.node(&keys[0]).unwrap()["frequency"], "045.100");

    registry.stop_all().await;
}

#[tokio::test]
async fn test_session_dies_when_watch_directory_vanishes() {
    let temp = TempDir::new().unwrap();
    let watch_dir = temp.path().join("watched");
    fs::create_dir(&watch_dir).unwrap();

    let (_store, registry) = registry_with_store();
    registry
        .create(SessionConfig::new("main", &watch_dir, TICK))
        .await
        .unwrap();
    assert!(registry.is_running("main").await);

    fs::remove_dir_all(&watch_dir).unwrap();

    // polled via is_running, which reflects the worker having exited
    let died = {
        let deadline = tokio::time::Instant::now() + PATIENCE;
        loop {
            if !registry.is_running("main").await {
                break true;
            }
            if tokio::time::Instant::now() > deadline {
                break false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    assert!(died, "session must terminate when its directory disappears");

    // the name is free again
    let new_dir = temp.path().join("replacement");
    fs::create_dir(&new_dir).unwrap();
    registry
        .create(SessionConfig::new("main", &new_dir, TICK))
        .await
        .unwrap();

    registry.stop_all().await;
}

#[tokio::test]
async fn test_create_rejects_missing_directory() {
    let (_store, registry) = registry_with_store();

    let result = registry
        .create(SessionConfig::new("main", "/nonexistent/path", TICK))
        .await;

    assert!(matches!(result, Err(WatchError::InvalidDirectory(_))));
    assert!(!registry.is_running("main").await);
}

#[tokio::test]
async fn test_file_mode_session_tracks_nested_files() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("captures");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("rec 044.800 am.wav"), b"x").unwrap();
    fs::write(temp.path().join("notes.txt"), b"x").unwrap();

    let (store, registry) = registry_with_store();
    registry
        .create(
            SessionConfig::new("files", temp.path(), TICK).with_mode(WatchMode::Files),
        )
        .await
        .unwrap();

    assert!(
        wait_until(PATIENCE, || store.keys_under("frequency/files").len() == 1).await
    );
    let keys = store.keys_under("frequency/files");
    assert_eq!(store.node(&keys[0]).unwrap()["frequency"], "044.800");

    registry.stop_all().await;
}

/// Wait until at least one reconciliation pass has completed somewhere.
async fn wait_for_a_pass(registry: &SessionRegistry, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        let total: u64 = registry
            .statuses()
            .await
            .iter()
            .map(|status| status.passes)
            .sum();
        if total > 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
