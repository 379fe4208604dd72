//! Persisted key-value state for analyses.
//!
//! One JSON value per key, last writer wins, no multi-key transactions.
//! [`SqliteStore`] survives restarts; [`MemoryStore`] lives for the process.
//! Key derivation lives in [`keys`].

pub mod keys;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove every listed key; missing keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<()>;
}

/// Read `key` and decode it as `T`.
pub async fn get_as<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and write it to `key`.
pub async fn set_as<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}
