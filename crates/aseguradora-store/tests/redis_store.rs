//! Redis store integration tests
//!
//! Run against a live server:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test -p aseguradora-store --features redis-tests`

#![cfg(feature = "redis-tests")]

use aseguradora_core::{Error, InsuranceType, NewPolicy, PolicyPatch};
use aseguradora_store::{generate_id, PolicyStore, RedisStore};

async fn store() -> RedisStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    // A fresh namespace per test keeps runs independent of each other.
    let namespace = format!("aseguradora-test-{}", generate_id());
    RedisStore::connect(&url, &namespace)
        .await
        .expect("Redis must be reachable at REDIS_URL")
}

fn fields(number: &str) -> NewPolicy {
    NewPolicy {
        policy_number: number.to_string(),
        insurance_type: InsuranceType::Auto,
        policy_holder: "Juan Pérez".to_string(),
        insured_amount: 12000.0,
    }
}

#[tokio::test]
async fn test_ping() {
    assert!(store().await.ping().await.is_ok());
}

#[tokio::test]
async fn test_create_get_list() {
    let store = store().await;
    let first = store.create(fields("P1")).await.unwrap();
    let second = store.create(fields("P2")).await.unwrap();

    assert_eq!(store.get(&first.id).await.unwrap(), Some(first.clone()));
    assert_eq!(store.list().await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn test_duplicate_number_on_create() {
    let store = store().await;
    store.create(fields("P1")).await.unwrap();

    let err = store.create(fields("P1")).await.unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_partial_update() {
    let store = store().await;
    let created = store.create(fields("P1")).await.unwrap();

    let patch = PolicyPatch {
        insurance_type: Some(InsuranceType::Life),
        ..Default::default()
    };
    let updated = store.update(&created.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.insurance_type, InsuranceType::Life);
    assert_eq!(updated.policy_number, "P1");
    assert_eq!(updated.policy_holder, created.policy_holder);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(store.get(&created.id).await.unwrap(), Some(updated));
}

#[tokio::test]
async fn test_renumber_moves_unique_index() {
    let store = store().await;
    let created = store.create(fields("P1")).await.unwrap();
    let other = store.create(fields("P2")).await.unwrap();

    let taken = PolicyPatch {
        policy_number: Some("P2".to_string()),
        ..Default::default()
    };
    let err = store.update(&created.id, taken).await.unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));

    let renumber = PolicyPatch {
        policy_number: Some("P3".to_string()),
        ..Default::default()
    };
    store.update(&created.id, renumber).await.unwrap().unwrap();

    // The old number is free again, the new one is taken.
    store.create(fields("P1")).await.unwrap();
    assert!(store.create(fields("P3")).await.is_err());
    assert!(store.get(&other.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete() {
    let store = store().await;
    let created = store.create(fields("P1")).await.unwrap();

    assert_eq!(store.delete(&created.id).await.unwrap(), Some(created.clone()));
    assert!(store.get(&created.id).await.unwrap().is_none());
    assert!(store.delete(&created.id).await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());

    store.create(fields("P1")).await.unwrap();
}

#[tokio::test]
async fn test_unknown_id() {
    let store = store().await;
    assert!(store.get("missing").await.unwrap().is_none());
    assert!(store
        .update("missing", PolicyPatch::default())
        .await
        .unwrap()
        .is_none());
}
