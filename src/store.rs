// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistence collaborator for registered domains.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Length of the secret that lets a registrant update or delete their domain.
pub const SECRET_KEY_LEN: usize = 24;

/// A registered domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainRecord {
    pub name: String,
    pub tld: String,
    #[serde(rename = "ip")]
    pub target: String,
    pub secret_key: String,
    pub created_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Build a record with a lower-cased name and a fresh secret key.
    pub fn new(name: &str, tld: &str, target: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            tld: tld.to_lowercase(),
            target: target.to_string(),
            secret_key: generate_secret_key(SECRET_KEY_LEN),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same name and tld already exists
    Conflict,
}

/// Domain record store.
#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn exists(&self, name: &str, tld: &str) -> Result<bool>;

    async fn insert(&self, record: DomainRecord) -> Result<InsertOutcome>;

    async fn get(&self, name: &str, tld: &str) -> Result<Option<DomainRecord>>;

    /// Point the domain owning `secret_key` at `target`. Returns the updated
    /// record, or `None` when no domain holds that key.
    async fn update_target(&self, secret_key: &str, target: &str) -> Result<Option<DomainRecord>>;

    /// Remove the domain owning `secret_key`. Returns false when none does.
    async fn delete(&self, secret_key: &str) -> Result<bool>;
}

#[derive(Debug, Default)]
struct Records {
    by_domain: HashMap<(String, String), DomainRecord>,
    by_secret: HashMap<String, (String, String)>,
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.by_domain.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.by_domain.is_empty()
    }
}

fn key(name: &str, tld: &str) -> (String, String) {
    (name.to_lowercase(), tld.to_lowercase())
}

#[async_trait]
impl DomainStore for MemoryStore {
    async fn exists(&self, name: &str, tld: &str) -> Result<bool> {
        Ok(self.records.read().await.by_domain.contains_key(&key(name, tld)))
    }

    async fn insert(&self, record: DomainRecord) -> Result<InsertOutcome> {
        let mut records = self.records.write().await;
        let k = key(&record.name, &record.tld);
        if records.by_domain.contains_key(&k) {
            return Ok(InsertOutcome::Conflict);
        }
        records.by_secret.insert(record.secret_key.clone(), k.clone());
        records.by_domain.insert(k, record);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, name: &str, tld: &str) -> Result<Option<DomainRecord>> {
        Ok(self.records.read().await.by_domain.get(&key(name, tld)).cloned())
    }

    async fn update_target(&self, secret_key: &str, target: &str) -> Result<Option<DomainRecord>> {
        let mut records = self.records.write().await;
        let Some(k) = records.by_secret.get(secret_key).cloned() else {
            return Ok(None);
        };
        Ok(records.by_domain.get_mut(&k).map(|record| {
            record.target = target.to_string();
            record.clone()
        }))
    }

    async fn delete(&self, secret_key: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(k) = records.by_secret.remove(secret_key) else {
            return Ok(false);
        };
        Ok(records.by_domain.remove(&k).is_some())
    }
}

/// Random alphanumeric secret.
pub fn generate_secret_key(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_conflict() {
        let store = MemoryStore::new();
        let record = DomainRecord::new("Hello", "dev", "1.1.1.1");
        assert_eq!(record.name, "hello");
        assert_eq!(record.secret_key.len(), SECRET_KEY_LEN);

        assert_eq!(store.insert(record).await.unwrap(), InsertOutcome::Inserted);
        assert!(store.exists("HELLO", "dev").await.unwrap());

        let duplicate = DomainRecord::new("hello", "dev", "2.2.2.2");
        assert_eq!(store.insert(duplicate).await.unwrap(), InsertOutcome::Conflict);
        assert_eq!(store.len().await, 1);

        let stored = store.get("hello", "dev").await.unwrap().unwrap();
        assert_eq!(stored.target, "1.1.1.1");
    }

    #[tokio::test]
    async fn test_secret_key_updates_and_deletes() {
        let store = MemoryStore::new();
        let record = DomainRecord::new("hello", "dev", "1.1.1.1");
        let secret = record.secret_key.clone();
        store.insert(record).await.unwrap();

        let updated = store.update_target(&secret, "8.8.8.8").await.unwrap().unwrap();
        assert_eq!(updated.target, "8.8.8.8");
        assert_eq!(store.get("hello", "dev").await.unwrap().unwrap().target, "8.8.8.8");
        assert!(store.update_target("wrong", "9.9.9.9").await.unwrap().is_none());

        assert!(!store.delete("wrong").await.unwrap());
        assert!(store.delete(&secret).await.unwrap());
        assert!(!store.exists("hello", "dev").await.unwrap());
        assert!(!store.delete(&secret).await.unwrap());
    }

    #[test]
    fn test_secret_keys_are_alphanumeric_and_distinct() {
        let a = generate_secret_key(SECRET_KEY_LEN);
        let b = generate_secret_key(SECRET_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
