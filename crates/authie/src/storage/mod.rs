//! Keyed persistence for flow state.
//!
//! The core never assumes a concrete storage technology. Everything it
//! persists (pending authorization requests, the current token record, and
//! cached discovery documents) goes through the [`KvStore`] trait, and every
//! key it writes lives under the reserved `"authie::"` prefix applied by
//! [`Keyspace`].
//!
//! The intended backing store is scoped to the browsing session: pending
//! records are short-lived by nature and must not outlive it. Implementations
//! with longer lifetimes weaken the security model and are the embedder's
//! responsibility.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Make [`KvStore::take`] atomic: it is the single-use claim primitive
//!   that prevents a pending authorization state from being redeemed twice
//! - Never log stored values (they contain code verifiers and tokens)

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

pub mod memory;

pub use memory::MemoryStore;

/// Reserved prefix for every key the core writes.
pub const KEY_PREFIX: &str = "authie::";

/// Errors raised by a storage backend or by record (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be serialized or deserialized.
    #[error("Failed to serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A keyed string store.
///
/// Values are opaque to the store; the core serializes records to JSON before
/// handing them over. `get` on an absent key is `None`, `delete` on an absent
/// key succeeds.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Deletes the value stored under `key`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically reads and deletes the value stored under `key`.
    ///
    /// Two concurrent `take` calls for the same key must not both observe the
    /// value: the operation claims the record in one step, so a pending
    /// authorization state can be redeemed at most once even when redemptions
    /// race.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// The core's view of a [`KvStore`]: namespaced keys, JSON-typed records.
///
/// All keys pass through here so the `"authie::"` prefix is applied in exactly
/// one place.
#[derive(Clone)]
pub struct Keyspace {
    store: Arc<dyn KvStore>,
}

impl Keyspace {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn full_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Reads and deserializes the record under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored JSON does not match
    /// the expected shape.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&Self::full_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes and stores a record under `key`, overwriting wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(&Self::full_key(key), raw).await
    }

    /// Deletes the record under `key`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::full_key(key)).await
    }

    /// Atomically claims (reads and deletes) the record under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored JSON does not match
    /// the expected shape.
    pub async fn take_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.take(&Self::full_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
    }

    #[tokio::test]
    async fn test_keyspace_applies_prefix() {
        let store = Arc::new(MemoryStore::new());
        let keys = Keyspace::new(store.clone());

        keys.set_json(
            "tokens",
            &Record {
                name: "value".to_string(),
            },
        )
        .await
        .unwrap();

        let raw = store.get("authie::tokens").await.unwrap();
        assert!(raw.is_some());
        assert!(store.get("tokens").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keyspace_round_trip_and_delete() {
        let keys = Keyspace::new(Arc::new(MemoryStore::new()));
        let record = Record {
            name: "pending".to_string(),
        };

        keys.set_json("state::abc", &record).await.unwrap();
        assert_eq!(
            keys.get_json::<Record>("state::abc").await.unwrap(),
            Some(Record {
                name: "pending".to_string()
            })
        );

        keys.delete("state::abc").await.unwrap();
        assert_eq!(keys.get_json::<Record>("state::abc").await.unwrap(), None);

        // Deleting again is fine.
        keys.delete("state::abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_keyspace_take_claims_once() {
        let keys = Keyspace::new(Arc::new(MemoryStore::new()));
        keys.set_json(
            "state::xyz",
            &Record {
                name: "once".to_string(),
            },
        )
        .await
        .unwrap();

        let first = keys.take_json::<Record>("state::xyz").await.unwrap();
        assert!(first.is_some());

        let second = keys.take_json::<Record>("state::xyz").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_keyspace_get_rejects_malformed_record() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("authie::tokens", "not json".to_string())
            .await
            .unwrap();

        let keys = Keyspace::new(store);
        let result = keys.get_json::<Record>("tokens").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
