// Integration tests for persisting the server configuration

use crate::common::{file_backed_service, fixture_conf, SS1};
use security_server::core::errors::ServerError;
use security_server::loader::serverconf_loader::ServerConfLoader;
use security_server::state::serverconf::ServerConfRepository;
use security_server::state::store::ServerConfStore;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_committed_transaction_is_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("serverconf.yaml");
    let store = Arc::new(ServerConfStore::new(fixture_conf()).with_write_back(path.clone()));

    file_backed_service(store.clone())
        .enable("2")
        .await
        .unwrap();

    let reloaded = ServerConfLoader::from_file(&path).unwrap();
    assert_eq!(reloaded, store.snapshot().await);
    assert!(!reloaded.get_service_description("2").unwrap().disabled);
    assert!(!dir.path().join("serverconf.yaml.tmp").exists());
}

#[tokio::test]
async fn test_failed_transaction_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("serverconf.yaml");
    let store = Arc::new(ServerConfStore::new(fixture_conf()).with_write_back(path.clone()));

    let result = file_backed_service(store.clone()).enable("999").await;

    assert!(result.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_write_failure_rolls_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("serverconf.yaml");
    let store = ServerConfStore::new(fixture_conf()).with_write_back(path);
    let before = store.snapshot().await;

    let result = store
        .transaction(|conf| {
            let mut client = conf.get_client(&SS1.parse().unwrap())?;
            client.service_descriptions.clear();
            conf.save_client(client)
        })
        .await;

    assert!(matches!(result, Err(ServerError::Persistence(_))));
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_cancelled_caller_still_commits_everywhere() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("serverconf.yaml");
    let store = ServerConfStore::new(fixture_conf()).with_write_back(path.clone());

    // The first poll runs the closure and hands the commit off, then the caller goes away
    let mut transaction = Box::pin(store.transaction(|conf| {
        let mut sd = conf.get_service_description("1")?;
        sd.disabled = true;
        sd.disabled_notice = "maintenance".to_string();
        conf.save_service_description(sd)
    }));
    let cancelled = tokio::select! {
        biased;
        _ = &mut transaction => false,
        _ = std::future::ready(()) => true,
    };
    assert!(cancelled, "transaction finished within its first poll");
    drop(transaction);

    // Readers wait for the detached commit to release the lock
    let in_memory = store.snapshot().await;
    let on_disk = ServerConfLoader::from_file(&path).unwrap();

    assert_eq!(on_disk, in_memory);
    let sd = in_memory.get_service_description("1").unwrap();
    assert!(sd.disabled);
    assert_eq!(sd.disabled_notice, "maintenance");
}
