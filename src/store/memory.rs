//! In-process [`DocumentStore`] over a single JSON tree.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::watch;

use super::paths::{self, segments};
use super::{DocumentStore, Snapshot, StoreError};

struct Watcher {
    path: String,
    tx: watch::Sender<Snapshot>,
}

struct Tree {
    root: Value,
    watchers: Vec<Watcher>,
    available: bool,
}

pub struct MemoryStore {
    tree: RwLock<Tree>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { tree: RwLock::new(Tree { root: Value::Object(Map::new()), watchers: Vec::new(), available: true }) }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoryStore").field("watchers", &tree.watchers.len()).field("available", &tree.available).finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Simulates losing the backend: while unavailable every write fails.
    pub fn set_available(&self, available: bool) {
        self.tree.write().unwrap_or_else(PoisonError::into_inner).available = available;
    }

    fn writable(&self, path: &str) -> Result<RwLockWriteGuard<'_, Tree>, StoreError> {
        let tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if !tree.available { return Err(StoreError::Unavailable(format!("cannot write {path}"))); }
        Ok(tree)
    }
}

impl Tree {
    fn snapshot(&self, path: &str) -> Snapshot {
        let mut node = Some(&self.root);
        for seg in segments(path) {
            node = node.and_then(|n| n.get(seg));
        }
        Snapshot::new(path, node.filter(|v| !is_empty(v)).cloned())
    }

    fn write(&mut self, path: &str, value: Value) {
        let segs: Vec<&str> = segments(path).collect();
        if is_empty(&value) {
            remove_at(&mut self.root, &segs);
        } else {
            insert_at(&mut self.root, &segs, value);
        }
        if !self.root.is_object() { self.root = Value::Object(Map::new()); }
    }

    /// Pushes fresh snapshots to every watcher near one of `written`.
    fn notify(&mut self, written: &[String]) {
        self.watchers.retain(|w| !w.tx.is_closed());
        for watcher in &self.watchers {
            if !written.iter().any(|p| paths::related(p, &watcher.path)) { continue; }
            let next = self.snapshot(&watcher.path);
            watcher.tx.send_if_modified(|current| {
                if *current == next { return false; }
                *current = next;
                true
            });
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn insert_at(node: &mut Value, segs: &[&str], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() { *node = Value::Object(Map::new()); }
    if let Value::Object(map) = node {
        insert_at(map.entry(head.to_string()).or_insert(Value::Null), rest, value);
    }
}

/// Deletes the node at `segs`; returns true when `node` is left empty so the
/// caller can prune it.
fn remove_at(node: &mut Value, segs: &[&str]) -> bool {
    let Some((head, rest)) = segs.split_first() else {
        *node = Value::Null;
        return true;
    };
    let Value::Object(map) = node else { return false };
    let prune = match map.get_mut(*head) {
        Some(child) => rest.is_empty() || remove_at(child, rest),
        None => false,
    };
    if prune { map.remove(*head); }
    map.is_empty()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Snapshot, StoreError> {
        Ok(self.tree.read().unwrap_or_else(PoisonError::into_inner).snapshot(path))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut tree = self.writable(path)?;
        tree.write(path, value);
        tree.notify(&[path.to_string()]);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut tree = self.writable(path)?;
        let written: Vec<String> = fields
            .into_iter()
            .map(|(key, value)| {
                let target = paths::join(path, &key);
                tree.write(&target, value);
                target
            })
            .collect();
        tree.notify(&written);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.set(path, Value::Null).await
    }

    fn subscribe(&self, path: &str) -> watch::Receiver<Snapshot> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        let (tx, rx) = watch::channel(tree.snapshot(path));
        tree.watchers.push(Watcher { path: path.to_string(), tx });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_read_and_remove_prunes_parents() {
        let store = MemoryStore::new();
        store.set("users/u1/cart/prod_1", json!({ "quantity": 1 })).await.unwrap();
        assert_eq!(store.read("users/u1/cart/prod_1/quantity").await.unwrap().value, Some(json!(1)));
        store.remove("users/u1/cart/prod_1").await.unwrap();
        assert!(!store.read("users/u1/cart").await.unwrap().exists());
        assert!(!store.read("users").await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_update_merges_nested_paths() {
        let store = MemoryStore::new();
        store.set("categories/cat_1", json!({ "name": "Sofas", "productCount": 0 })).await.unwrap();
        let mut fields = Map::new();
        fields.insert("cat_1/productCount".into(), json!(3));
        fields.insert("cat_2/productCount".into(), json!(1));
        store.update("categories", fields).await.unwrap();
        let snapshot = store.read("categories").await.unwrap();
        assert_eq!(snapshot.value, Some(json!({ "cat_1": { "name": "Sofas", "productCount": 3 }, "cat_2": { "productCount": 1 } })));
    }

    #[tokio::test]
    async fn test_push_generates_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.push("newsletter", json!({ "email": "a@b.co" })).await.unwrap();
        let b = store.push("newsletter", json!({ "email": "c@d.co" })).await.unwrap();
        assert_ne!(a, b);
        let all = store.read("newsletter").await.unwrap().value.unwrap();
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_related_writes_only() {
        let store = MemoryStore::new();
        let mut cart = store.subscribe("users/u1/cart");
        let mut other = store.subscribe("products");
        assert!(!cart.borrow().exists());

        store.set("users/u1/cart/prod_1", json!({ "quantity": 2 })).await.unwrap();
        assert!(cart.has_changed().unwrap());
        assert_eq!(cart.borrow_and_update().value, Some(json!({ "prod_1": { "quantity": 2 } })));
        assert!(!other.has_changed().unwrap());

        // an ancestor write reaches the subscriber too
        store.remove("users/u1").await.unwrap();
        assert!(!cart.borrow_and_update().exists());

        // an unchanged value is not re-sent
        store.remove("users/u1").await.unwrap();
        assert!(!cart.has_changed().unwrap());
        assert!(!other.borrow_and_update().exists());
    }

    #[tokio::test]
    async fn test_writes_fail_while_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        let err = store.set("products/p", json!({ "name": "x" })).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        store.set_available(true);
        store.set("products/p", json!({ "name": "x" })).await.unwrap();
    }
}
