//! Checkout and the customer's order history.

use serde::Serialize;
use validator::Validate;

use super::Storefront;
use crate::domain::aggregates::{CustomerContact, OrderFilter};
use crate::domain::events::OrderEvent;
use crate::store::paths;
use crate::{Order, Result, ShopError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOutcome {
    pub added: usize,
    /// Lines whose product is no longer sold.
    pub skipped: Vec<String>,
}

impl Storefront {
    /// Turns the cart into a pending order. The order, its mirror and the
    /// emptied cart are written together, so a failed write leaves neither an
    /// order nor a cleared cart behind. The applied promo is dropped afterwards.
    pub async fn checkout(&self, uid: &str, contact: CustomerContact) -> Result<Order> {
        contact.validate()?;
        let cart = self.cart(uid).await?;
        let discount = self.promo(uid).discount();
        let fee = self.current_delivery_fee().await;
        let order = Order::place(self.store().new_key(), uid, &cart, contact, discount, fee)?;
        self.persist(uid, OrderEvent::Placed(order.clone())).await?;
        self.clear_promo(uid);
        self.cache().clear_cart(uid);
        tracing::info!(uid, order_id = %order.id, reference = %order.short_ref(), total = order.total, "order placed");
        Ok(order)
    }

    /// The user's orders for one status tab, newest first.
    pub async fn user_orders(&self, uid: &str, filter: OrderFilter) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.store().read(&paths::user_orders(uid)).await?.records();
        Ok(filter.apply(orders))
    }

    pub async fn user_order(&self, uid: &str, order_id: &str) -> Result<Order> {
        let mut order: Order = self.store().read(&paths::user_order(uid, order_id)).await?.val()?.ok_or(ShopError::OrderNotFound)?;
        order.id = order_id.to_string();
        if order.user_id.is_empty() { order.user_id = uid.to_string(); }
        Ok(order)
    }

    pub async fn cancel_order(&self, uid: &str, order_id: &str) -> Result<Order> {
        let mut order = self.user_order(uid, order_id).await?;
        let event = order.cancel()?;
        self.persist(uid, event).await?;
        tracing::info!(uid, order_id, "order cancelled");
        Ok(order)
    }

    /// Adds one unit of every line of a past order back to the cart, at
    /// today's price.
    pub async fn reorder(&self, uid: &str, order_id: &str) -> Result<ReorderOutcome> {
        let order = self.user_order(uid, order_id).await?;
        let mut outcome = ReorderOutcome::default();
        for line in &order.items {
            match self.add_to_cart(uid, &line.id).await {
                Ok(_) => outcome.added += 1,
                Err(ShopError::ProductNotFound) => outcome.skipped.push(line.id.clone()),
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::domain::aggregates::OrderError;
    use crate::store::DocumentStore;
    use crate::OrderStatus;

    fn contact() -> CustomerContact {
        CustomerContact { customer_name: "Ayesha".into(), email: "ayesha@gmail.com".into(), phone: "03001234567".into(), address: "12 Mall Road".into(), ..Default::default() }
    }

    async fn shop_with_cart() -> (std::sync::Arc<crate::store::MemoryStore>, Storefront) {
        let (store, shop) = shop();
        put_product(&store, "p1", 45000, "cat_1").await;
        put_product(&store, "p2", 12000, "cat_4").await;
        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.add_to_cart("u1", "p2").await.unwrap();
        shop.add_to_cart("u1", "p2").await.unwrap();
        (store, shop)
    }

    #[tokio::test]
    async fn test_checkout_writes_both_copies_and_clears_cart() {
        let (store, shop) = shop_with_cart().await;
        shop.apply_promo("u1", "SAVE10").await.unwrap();
        let order = shop.checkout("u1", contact()).await.unwrap();
        assert_eq!(order.total, 62600);
        assert_eq!(order.status, OrderStatus::Pending);

        assert!(store.read(&paths::order(&order.id)).await.unwrap().exists());
        let mirrored = shop.user_order("u1", &order.id).await.unwrap();
        assert_eq!((mirrored.user_id.as_str(), mirrored.total, mirrored.items.len()), ("u1", 62600, 2));
        assert!(shop.cart("u1").await.unwrap().is_empty());
        assert_eq!(shop.promo("u1").discount(), 0);
    }

    #[tokio::test]
    async fn test_failed_checkout_can_be_retried_once() {
        let (store, shop) = flaky_shop();
        put_product(&store.inner, "p1", 45000, "cat_1").await;
        shop.add_to_cart("u1", "p1").await.unwrap();
        shop.apply_promo("u1", "SAVE10").await.unwrap();

        FlakyStore::fail(&store.fail_writes, true);
        assert!(matches!(shop.checkout("u1", contact()).await, Err(ShopError::Storage(_))));
        FlakyStore::fail(&store.fail_writes, false);
        assert!(!store.read(paths::ORDERS).await.unwrap().exists());
        assert_eq!(shop.cart("u1").await.unwrap().item_count(), 1);
        assert_eq!(shop.promo("u1").discount(), 4500);

        // cart removal is never a separate step that could fail on its own
        FlakyStore::fail(&store.fail_removes, true);
        let order = shop.checkout("u1", contact()).await.unwrap();
        assert_eq!(order.discount, 4500);
        let orders = store.read(paths::ORDERS).await.unwrap().value.unwrap();
        assert_eq!(orders.as_object().unwrap().len(), 1);
        assert!(shop.cart("u1").await.unwrap().is_empty());
        assert_eq!(shop.promo_entries(), 0);
        assert!(matches!(shop.checkout("u1", contact()).await, Err(ShopError::Order(OrderError::NoItems))));
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_bad_contact() {
        let (_store, shop) = shop();
        assert!(matches!(shop.checkout("u1", contact()).await, Err(ShopError::Order(OrderError::NoItems))));
        let bad = CustomerContact { email: "nope".into(), ..contact() };
        assert!(matches!(shop.checkout("u1", bad).await, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let (store, shop) = shop_with_cart().await;
        let order = shop.checkout("u1", contact()).await.unwrap();
        let cancelled = shop.cancel_order("u1", &order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let shared: Order = store.read(&paths::order(&order.id)).await.unwrap().val().unwrap().unwrap();
        assert_eq!(shared.status, OrderStatus::Cancelled);
        assert!(shared.cancelled_at.is_some());

        let again = shop.cancel_order("u1", &order.id).await;
        assert!(matches!(again, Err(ShopError::Order(OrderError::CannotCancel(OrderStatus::Cancelled)))));
        assert!(matches!(shop.cancel_order("u1", "missing").await, Err(ShopError::OrderNotFound)));
    }

    #[tokio::test]
    async fn test_history_tabs_and_reorder() {
        let (store, shop) = shop_with_cart().await;
        let first = shop.checkout("u1", contact()).await.unwrap();
        shop.add_to_cart("u1", "p1").await.unwrap();
        let second = shop.checkout("u1", contact()).await.unwrap();
        shop.cancel_order("u1", &first.id).await.unwrap();

        let all = shop.user_orders("u1", OrderFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].order_date >= all[1].order_date);
        let pending = shop.user_orders("u1", OrderFilter::Status(OrderStatus::Pending)).await.unwrap();
        assert_eq!(pending.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), [second.id.as_str()]);

        store.remove(&paths::product("p2")).await.unwrap();
        let outcome = shop.reorder("u1", &first.id).await.unwrap();
        assert_eq!(outcome, ReorderOutcome { added: 1, skipped: vec!["p2".into()] });
        assert_eq!(shop.cart("u1").await.unwrap().item_count(), 1);
    }
}
