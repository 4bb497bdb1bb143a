//! In-memory policy store

use aseguradora_core::{Error, NewPolicy, Policy, PolicyPatch, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::{generate_id, now, PolicyStore};

/// Process-local engine. Records are kept in creation order and lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Policy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored policies
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn create(&self, fields: NewPolicy) -> Result<Policy> {
        let mut records = self.records.write();

        if records
            .iter()
            .any(|p| p.policy_number == fields.policy_number)
        {
            return Err(Error::duplicate_policy_number(&fields.policy_number));
        }

        let policy = Policy::new(generate_id(), fields, now());
        records.push(policy.clone());
        debug!(id = %policy.id, "Stored policy");

        Ok(policy)
    }

    async fn list(&self) -> Result<Vec<Policy>> {
        Ok(self.records.read().clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Policy>> {
        Ok(self.records.read().iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: &str, patch: PolicyPatch) -> Result<Option<Policy>> {
        let mut records = self.records.write();

        let Some(index) = records.iter().position(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(number) = &patch.policy_number {
            if records
                .iter()
                .any(|p| p.id != id && &p.policy_number == number)
            {
                return Err(Error::duplicate_policy_number(number));
            }
        }

        let policy = &mut records[index];
        patch.apply(policy, now());
        Ok(Some(policy.clone()))
    }

    async fn delete(&self, id: &str) -> Result<Option<Policy>> {
        let mut records = self.records.write();
        let removed = records
            .iter()
            .position(|p| p.id == id)
            .map(|index| records.remove(index));
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aseguradora_core::InsuranceType;

    fn fields(number: &str) -> NewPolicy {
        NewPolicy {
            policy_number: number.to_string(),
            insurance_type: InsuranceType::Home,
            policy_holder: "Ana Gómez".to_string(),
            insured_amount: 150_000.0,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let created = store.create(fields("H-1")).await.unwrap();

        assert_eq!(created.policy_number, "H-1");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_policy_number() {
        let store = MemoryStore::new();
        store.create(fields("H-1")).await.unwrap();

        let err = store.create(fields("H-1")).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_keeps_creation_order() {
        let store = MemoryStore::new();
        for number in ["A", "B", "C"] {
            store.create(fields(number)).await.unwrap();
        }

        let numbers: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.policy_number)
            .collect();
        assert_eq!(numbers, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let created = store.create(fields("H-1")).await.unwrap();

        let patch = PolicyPatch {
            insured_amount: Some(200_000.0),
            ..Default::default()
        };
        let updated = store.update(&created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.insured_amount, 200_000.0);
        assert_eq!(updated.policy_number, "H-1");
        assert_eq!(updated.policy_holder, "Ana Gómez");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_to_taken_number_is_rejected() {
        let store = MemoryStore::new();
        let first = store.create(fields("H-1")).await.unwrap();
        let second = store.create(fields("H-2")).await.unwrap();

        let patch = PolicyPatch {
            policy_number: Some("H-1".to_string()),
            policy_holder: Some("Changed".to_string()),
            ..Default::default()
        };
        let err = store.update(&second.id, patch).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        let unchanged = store.get(&second.id).await.unwrap().unwrap();
        assert_eq!(unchanged, second);
        assert_eq!(store.get(&first.id).await.unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn test_update_may_keep_own_number() {
        let store = MemoryStore::new();
        let created = store.create(fields("H-1")).await.unwrap();

        let patch = PolicyPatch {
            policy_number: Some("H-1".to_string()),
            ..Default::default()
        };
        assert!(store.update(&created.id, patch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store
            .update("nope", PolicyPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(store.delete("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_frees_policy_number() {
        let store = MemoryStore::new();
        let created = store.create(fields("H-1")).await.unwrap();

        let removed = store.delete(&created.id).await.unwrap();
        assert_eq!(removed, Some(created.clone()));
        assert!(store.get(&created.id).await.unwrap().is_none());
        assert!(store.is_empty());

        store.create(fields("H-1")).await.unwrap();
    }
}
