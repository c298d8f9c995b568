//! Realtime document store seam.
//!
//! Documents live in one JSON tree addressed by slash-separated paths
//! (`products/prod_1`, `users/{uid}/cart/{productId}`). Subscriptions hand out
//! a `watch` receiver that always holds the latest snapshot of a path.

pub mod local;
pub mod memory;
pub mod paths;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::Record;

pub use local::LocalCache;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("permission denied at {0}")]
    PermissionDenied(String),

    #[error("nothing stored at {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Value of one path at one point in time. `None` means nothing is stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self { path: path.into(), value }
    }

    pub fn exists(&self) -> bool { self.value.is_some() }

    pub fn val<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        self.value
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|source| StoreError::Malformed { path: self.path.clone(), source })
    }

    /// Children of a collection snapshot in key order. Entries that do not
    /// parse are logged and skipped; a missing id is filled from the key.
    pub fn records<T: DeserializeOwned + Record>(&self) -> Vec<T> {
        let Some(Value::Object(children)) = &self.value else { return Vec::new() };
        children
            .iter()
            .filter_map(|(key, doc)| match serde_json::from_value::<T>(doc.clone()) {
                Ok(mut record) => {
                    record.assign_key(key);
                    Some(record)
                }
                Err(e) => {
                    tracing::warn!(path = %self.path, key = %key, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

/// Serializes a record for storage.
pub fn to_document<T: Serialize>(path: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Malformed { path: path.to_string(), source })
}

/// The operations the storefront needs from its backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Snapshot, StoreError>;

    /// Replaces whatever is at `path`. Writing `null` deletes.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merges `fields` into `path`. Keys may themselves be nested paths.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    fn subscribe(&self, path: &str) -> watch::Receiver<Snapshot>;

    /// Time-ordered key for appended children.
    fn new_key(&self) -> String { Uuid::now_v7().to_string() }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let key = self.new_key();
        self.set(&paths::join(path, &key), value).await?;
        Ok(key)
    }
}
