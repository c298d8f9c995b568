//! Local key/value cache holding each user's cart for when the backend
//! cannot be written. Entries are keyed `cart/{uid}`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::StoreError;
use crate::CartItem;

pub const CART_KEY: &str = "cart";

pub fn cart_key(uid: &str) -> String { format!("{CART_KEY}/{uid}") }

#[derive(Debug, Default)]
pub struct LocalCache {
    entries: Mutex<HashMap<String, String>>,
}

impl LocalCache {
    pub fn new() -> Self { Self::default() }

    pub fn set_item(&self, key: &str, value: String) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), value);
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn remove_item(&self, key: &str) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    }

    /// Stores the user's cart as a plain JSON array of lines.
    pub fn save_cart(&self, uid: &str, items: &[CartItem]) -> Result<(), StoreError> {
        let key = cart_key(uid);
        let json = serde_json::to_string(items).map_err(|source| StoreError::Malformed { path: key.clone(), source })?;
        self.set_item(&key, json);
        Ok(())
    }

    /// Cached cart lines for one user; an unreadable entry counts as no cache.
    pub fn load_cart(&self, uid: &str) -> Vec<CartItem> {
        let Some(raw) = self.get_item(&cart_key(uid)) else { return Vec::new() };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(uid, error = %e, "discarding unreadable cart cache");
            Vec::new()
        })
    }

    pub fn clear_cart(&self, uid: &str) { self.remove_item(&cart_key(uid)); }
}
