//! Write-through operations against the document store.
//!
//! Every mutation loads the affected documents, runs the aggregate, and writes
//! the resulting event straight back. There is no local copy to reconcile: the
//! store's subscriptions are the source of truth for every view.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod contact;
pub mod orders;
pub mod team;

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::events::{CartEvent, DomainEvent, OrderEvent, WishlistEvent};
use crate::pricing::{PromoState, PromoTable, DELIVERY_FEE};
use crate::store::{paths, to_document, DocumentStore, LocalCache, StoreError};
use crate::{OrderStatus, Result};

pub use admin::{AdminConsole, CategoryDraft, Dashboard, DealDraft, DealListing, ProductDraft, SettingsPatch};
pub use cart::CartSummary;
pub use contact::{ContactForm, ContactMessage, Mailer};
pub use orders::ReorderOutcome;
pub use team::TeamRoster;

/// Handle shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct Storefront {
    store: Arc<dyn DocumentStore>,
    cache: Arc<LocalCache>,
    promo_table: Arc<PromoTable>,
    promos: Arc<Mutex<HashMap<String, PromoState>>>,
    mailer: Option<Arc<dyn Mailer>>,
    delivery_fee: i64,
}

impl Storefront {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: Arc::new(LocalCache::new()),
            promo_table: Arc::new(PromoTable::default()),
            promos: Arc::default(),
            mailer: None,
            delivery_fee: DELIVERY_FEE,
        }
    }

    pub fn with_delivery_fee(mut self, fee: i64) -> Self { self.delivery_fee = fee; self }
    pub fn with_promo_table(mut self, table: PromoTable) -> Self { self.promo_table = Arc::new(table); self }
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self { self.mailer = Some(mailer); self }
    pub fn with_cache(mut self, cache: Arc<LocalCache>) -> Self { self.cache = cache; self }

    pub fn store(&self) -> &dyn DocumentStore { self.store.as_ref() }
    pub fn shared_store(&self) -> Arc<dyn DocumentStore> { Arc::clone(&self.store) }
    pub fn cache(&self) -> &LocalCache { &self.cache }
    pub fn delivery_fee(&self) -> i64 { self.delivery_fee }

    /// Runs `f` against a copy of the user's promo state and keeps the result
    /// only while a code is applied.
    pub(crate) fn update_promo<T>(&self, uid: &str, f: impl FnOnce(&mut PromoState) -> T) -> T {
        let mut promos = self.promos.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = promos.get(uid).cloned().unwrap_or_default();
        let out = f(&mut state);
        if state.applied().is_some() {
            promos.insert(uid.to_string(), state);
        } else {
            promos.remove(uid);
        }
        out
    }

    pub fn promo(&self, uid: &str) -> PromoState {
        self.promos.lock().unwrap_or_else(PoisonError::into_inner).get(uid).cloned().unwrap_or_default()
    }

    pub(crate) fn clear_promo(&self, uid: &str) {
        self.promos.lock().unwrap_or_else(PoisonError::into_inner).remove(uid);
    }

    #[cfg(test)]
    pub(crate) fn promo_entries(&self) -> usize { self.promos.lock().unwrap_or_else(PoisonError::into_inner).len() }

    /// Delivery fee charged right now: the admin's `settings/deliveryFee` when
    /// one is stored, otherwise the configured fee.
    pub async fn current_delivery_fee(&self) -> i64 {
        let path = paths::join(paths::SETTINGS, "deliveryFee");
        match self.store().read(&path).await.and_then(|snapshot| snapshot.val::<i64>()) {
            Ok(Some(fee)) if fee >= 0 => fee,
            Ok(Some(fee)) => {
                tracing::warn!(fee, "ignoring negative delivery fee in settings");
                self.delivery_fee
            }
            Ok(None) => self.delivery_fee,
            Err(e) => {
                tracing::warn!(error = %e, "delivery fee setting unreadable, using configured fee");
                self.delivery_fee
            }
        }
    }

    /// Writes one domain event to the documents it touches.
    pub(crate) async fn persist(&self, uid: &str, event: impl Into<DomainEvent>) -> std::result::Result<(), StoreError> {
        let store = self.store();
        match event.into() {
            DomainEvent::Cart(CartEvent::LineSaved(line)) => {
                let path = paths::cart_line(uid, &line.id);
                store.set(&path, to_document(&path, &line)?).await
            }
            DomainEvent::Cart(CartEvent::LineRemoved { product_id }) => store.remove(&paths::cart_line(uid, &product_id)).await,
            DomainEvent::Cart(CartEvent::Cleared) => store.remove(&paths::cart(uid)).await,
            DomainEvent::Wishlist(WishlistEvent::Added(item)) => {
                let path = paths::wishlist_item(uid, &item.id);
                store.set(&path, to_document(&path, &item)?).await
            }
            DomainEvent::Wishlist(WishlistEvent::Removed { product_id }) => store.remove(&paths::wishlist_item(uid, &product_id)).await,
            // the order, its mirror and the emptied cart land in one update
            DomainEvent::Order(OrderEvent::Placed(order)) => {
                let doc = to_document(&paths::order(&order.id), &order)?;
                let mut fields: Map<String, Value> = order_locations(&order.id, &order.user_id).into_iter().map(|path| (path, doc.clone())).collect();
                if !order.user_id.is_empty() { fields.insert(paths::cart(&order.user_id), Value::Null); }
                store.update("", fields).await
            }
            DomainEvent::Order(OrderEvent::StatusChanged { order_id, user_id, status, at }) => {
                let mut fields = Map::new();
                for base in order_locations(&order_id, &user_id) {
                    fields.insert(format!("{base}/status"), json!(status));
                    fields.insert(format!("{base}/updatedAt"), json!(at.timestamp_millis()));
                }
                store.update("", fields).await
            }
            DomainEvent::Order(OrderEvent::Cancelled { order_id, user_id, at }) => {
                let mut fields = Map::new();
                for base in order_locations(&order_id, &user_id) {
                    fields.insert(format!("{base}/status"), json!(OrderStatus::Cancelled));
                    fields.insert(format!("{base}/cancelledAt"), json!(at.timestamp_millis()));
                    fields.insert(format!("{base}/updatedAt"), json!(at.timestamp_millis()));
                }
                store.update("", fields).await
            }
        }
    }
}

/// The shop-wide order document and the customer's mirror of it.
fn order_locations(order_id: &str, user_id: &str) -> Vec<String> {
    let mut locations = vec![paths::order(order_id)];
    if !user_id.is_empty() { locations.push(paths::user_order(user_id, order_id)); }
    locations
}

/// Writes the given `(category id, count)` pairs in one update.
pub async fn write_category_counts(store: &dyn DocumentStore, counts: &[(String, u32)]) -> Result<()> {
    if counts.is_empty() { return Ok(()); }
    let fields: Map<String, Value> = counts.iter().map(|(id, count)| (format!("{id}/productCount"), json!(count))).collect();
    store.update(paths::CATEGORIES, fields).await?;
    tracing::debug!(updated = counts.len(), "category counts written");
    Ok(())
}
