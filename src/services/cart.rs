//! Cart and wishlist write-through.

use serde::Serialize;

use super::Storefront;
use crate::domain::aggregates::{Cart, CartError, Wishlist};
use crate::domain::events::CartEvent;
use crate::pricing::{AppliedPromo, CartTotals};
use crate::store::paths;
use crate::{CartItem, Deal, Result, ShopError, WishlistItem};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub totals: CartTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<AppliedPromo>,
}

impl Storefront {
    /// The user's cart as stored. When the store cannot be read, the local
    /// fallback copy is used instead.
    pub async fn cart(&self, uid: &str) -> Result<Cart> {
        match self.store().read(&paths::cart(uid)).await {
            Ok(snapshot) => Ok(Cart::from_items(snapshot.records::<CartItem>())),
            Err(e) => {
                tracing::warn!(uid, error = %e, "cart read failed, using local cache");
                Ok(Cart::from_items(self.cache().load_cart(uid)))
            }
        }
    }

    pub async fn cart_summary(&self, uid: &str) -> Result<CartSummary> {
        let cart = self.cart(uid).await?;
        let promo = self.promo(uid);
        let fee = self.current_delivery_fee().await;
        Ok(CartSummary {
            item_count: cart.item_count(),
            totals: promo.totals(cart.items(), fee),
            promo: promo.applied().cloned(),
            items: cart.into_items(),
        })
    }

    /// Adds one unit of a product, or of a deal when no product has that id.
    pub async fn add_to_cart(&self, uid: &str, product_id: &str) -> Result<CartItem> {
        let source = match self.product(product_id).await {
            Ok(product) => LineSource::Product(product),
            Err(ShopError::ProductNotFound) => LineSource::Deal(self.deal(product_id).await?),
            Err(e) => return Err(e),
        };
        let mut saved = None;
        self.mutate_cart(uid, |cart| {
            let event = match &source {
                LineSource::Product(product) => cart.add_product(product),
                LineSource::Deal(deal) => cart.add_deal(deal),
            };
            if let CartEvent::LineSaved(line) = &event { saved = Some(line.clone()); }
            Ok(event)
        })
        .await?;
        tracing::info!(uid, product_id, "added to cart");
        saved.ok_or(ShopError::ProductNotFound)
    }

    pub async fn increase_quantity(&self, uid: &str, product_id: &str) -> Result<Cart> {
        self.mutate_cart(uid, |cart| cart.increment(product_id)).await
    }

    /// Removes the line instead when it is down to one unit.
    pub async fn decrease_quantity(&self, uid: &str, product_id: &str) -> Result<Cart> {
        self.mutate_cart(uid, |cart| cart.decrement(product_id)).await
    }

    pub async fn remove_from_cart(&self, uid: &str, product_id: &str) -> Result<Cart> {
        self.mutate_cart(uid, |cart| cart.remove(product_id)).await
    }

    /// Empties the cart and drops any applied promo.
    pub async fn clear_cart(&self, uid: &str) -> Result<Cart> {
        let cart = self.mutate_cart(uid, |cart| Ok(cart.clear())).await?;
        self.clear_promo(uid);
        Ok(cart)
    }

    pub async fn apply_promo(&self, uid: &str, code: &str) -> Result<AppliedPromo> {
        let cart = self.cart(uid).await?;
        let applied = self.update_promo(uid, |promo| promo.apply(code, cart.items(), &self.promo_table).cloned())?;
        tracing::info!(uid, code = %applied.code, discount = applied.discount, "promo applied");
        Ok(applied)
    }

    pub async fn wishlist(&self, uid: &str) -> Result<Wishlist> {
        Ok(Wishlist::from_items(self.store().read(&paths::wishlist(uid)).await?.records::<WishlistItem>()))
    }

    /// Returns whether the product is on the wishlist afterwards.
    pub async fn toggle_wishlist(&self, uid: &str, product_id: &str) -> Result<bool> {
        let product = self.product(product_id).await?;
        let mut wishlist = self.wishlist(uid).await?;
        let event = wishlist.toggle(&product);
        self.persist(uid, event).await?;
        Ok(wishlist.contains(product_id))
    }

    /// Loads the cart, applies `change` and writes the resulting event. A failed
    /// write leaves the changed cart in the user's local cache entry and is
    /// reported; a successful one drops that entry.
    async fn mutate_cart(&self, uid: &str, change: impl FnOnce(&mut Cart) -> std::result::Result<CartEvent, CartError>) -> Result<Cart> {
        let mut cart = self.cart(uid).await?;
        let event = change(&mut cart)?;
        if let Err(e) = self.persist(uid, event).await {
            tracing::error!(uid, error = %e, "cart write failed, saving local copy");
            if let Err(cache_err) = self.cache().save_cart(uid, cart.items()) {
                tracing::error!(uid, error = %cache_err, "local cart cache failed");
            }
            return Err(e.into());
        }
        self.cache().clear_cart(uid);
        Ok(cart)
    }

    async fn deal(&self, id: &str) -> Result<Deal> {
        let mut deal: Deal = self.store().read(&paths::deal(id)).await?.val()?.ok_or(ShopError::ProductNotFound)?;
        deal.id = id.to_string();
        if !deal.is_active() { return Err(ShopError::ProductNotFound); }
        Ok(deal)
    }
}

enum LineSource {
    Product(crate::Product),
    Deal(Deal),
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::domain::aggregates::CartError;
    use crate::store::{paths, DocumentStore};
    use crate::ShopError;
    use serde_json::json;

    #[tokio::test]
    async fn test_quantity_changes_write_through() {
        let (store, shop) = shop();
        put_product(&store, "p1", 45000, "cat_1").await;
        put_product(&store, "p2", 12000, "cat_4").await;

        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.add_to_cart("u1", "p2").await.unwrap();
        let line = shop.add_to_cart("u1", "p2").await.unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.image, "p2.jpg");

        let summary = shop.cart_summary("u1").await.unwrap();
        assert_eq!(summary.totals.subtotal, 69000);
        assert_eq!(summary.totals.total, 69500);
        assert_eq!(summary.item_count, 3);

        shop.increase_quantity("u1", "p1").await.unwrap();
        let stored = store.read(&paths::cart_line("u1", "p1")).await.unwrap();
        assert_eq!(stored.value.unwrap()["quantity"], json!(2));

        shop.decrease_quantity("u1", "p1").await.unwrap();
        let cart = shop.decrease_quantity("u1", "p1").await.unwrap();
        assert!(cart.get("p1").is_none());
        assert!(!store.read(&paths::cart_line("u1", "p1")).await.unwrap().exists());

        shop.remove_from_cart("u1", "p2").await.unwrap();
        assert!(!store.read(&paths::cart("u1")).await.unwrap().exists());
        assert!(matches!(shop.remove_from_cart("u1", "p2").await, Err(ShopError::Cart(CartError::ItemNotFound))));
    }

    #[tokio::test]
    async fn test_deals_can_be_added() {
        let (store, shop) = shop();
        store.set(&paths::deal("d1"), json!({ "name": "Sofa deal", "price": 85000, "originalPrice": 95000, "status": "active" })).await.unwrap();
        let line = shop.add_to_cart("u1", "d1").await.unwrap();
        assert_eq!(line.original_price, Some(95000));
        assert!(matches!(shop.add_to_cart("u1", "nope").await, Err(ShopError::ProductNotFound)));
    }

    #[tokio::test]
    async fn test_failed_write_falls_back_to_local_cache() {
        let (store, shop) = shop();
        put_product(&store, "p1", 45000, "cat_1").await;
        shop.add_to_cart("u1", "p1").await.unwrap();

        store.set_available(false);
        let err = shop.increase_quantity("u1", "p1").await.unwrap_err();
        assert!(matches!(err, ShopError::Storage(_)));
        let cached = shop.cache().load_cart("u1");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].quantity, 2);
        // no rollback, the store still holds the old line
        assert_eq!(shop.cart("u1").await.unwrap().item_count(), 1);
    }

    #[tokio::test]
    async fn test_cart_cache_stays_with_its_user() {
        let (store, shop) = flaky_shop();
        put_product(&store.inner, "p1", 45000, "cat_1").await;
        shop.add_to_cart("alice", "p1").await.unwrap();

        FlakyStore::fail(&store.fail_writes, true);
        assert!(shop.increase_quantity("alice", "p1").await.is_err());
        FlakyStore::fail(&store.fail_writes, false);

        FlakyStore::fail(&store.fail_reads, true);
        assert!(shop.cart("bob").await.unwrap().is_empty());
        let alice = shop.cart("alice").await.unwrap();
        assert_eq!(alice.get("p1").map(|line| line.quantity), Some(2));
        FlakyStore::fail(&store.fail_reads, false);

        // a later successful write drops the stale copy
        shop.increase_quantity("alice", "p1").await.unwrap();
        assert!(shop.cache().load_cart("alice").is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let (store, shop) = shop();
        put_product(&store, "p1", 45000, "cat_1").await;
        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.apply_promo("u1", "SAVE500").await.unwrap();
        assert!(shop.clear_cart("u1").await.unwrap().is_empty());
        assert!(!store.read(&paths::cart("u1")).await.unwrap().exists());
        assert_eq!(shop.promo("u1").discount(), 0);
    }

    #[tokio::test]
    async fn test_reading_totals_keeps_no_promo_state() {
        let (store, shop) = shop();
        for i in 0..100 {
            shop.cart_summary(&format!("visitor-{i}")).await.unwrap();
        }
        assert_eq!(shop.promo_entries(), 0);

        put_product(&store, "p1", 45000, "cat_1").await;
        assert!(shop.apply_promo("u1", "SAVE10").await.is_err());
        assert_eq!(shop.promo_entries(), 0);
        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.apply_promo("u1", "SAVE10").await.unwrap();
        assert_eq!(shop.promo_entries(), 1);
    }

    #[tokio::test]
    async fn test_promo_against_stored_cart() {
        let (store, shop) = shop();
        assert!(matches!(shop.apply_promo("u1", "SAVE10").await, Err(ShopError::EmptyCart)));
        put_product(&store, "p1", 45000, "cat_1").await;
        put_product(&store, "p2", 12000, "cat_4").await;
        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.add_to_cart("u1", "p2").await.unwrap();
        shop.add_to_cart("u1", "p2").await.unwrap();

        assert_eq!(shop.apply_promo("u1", " save10 ").await.unwrap().discount, 6900);
        assert!(matches!(shop.apply_promo("u1", "NOPE").await, Err(ShopError::InvalidPromoCode)));
        let summary = shop.cart_summary("u1").await.unwrap();
        assert_eq!(summary.totals.total, 62600);
        assert_eq!(summary.promo.unwrap().code.as_str(), "SAVE10");
        assert_eq!(shop.cart_summary("u2").await.unwrap().totals.discount, 0);
    }

    #[tokio::test]
    async fn test_wishlist_toggle() {
        let (store, shop) = shop();
        put_product(&store, "p1", 45000, "cat_1").await;
        assert!(shop.toggle_wishlist("u1", "p1").await.unwrap());
        assert!(store.read(&paths::wishlist_item("u1", "p1")).await.unwrap().exists());
        assert!(!shop.toggle_wishlist("u1", "p1").await.unwrap());
        assert!(shop.wishlist("u1").await.unwrap().items().is_empty());
    }
}
