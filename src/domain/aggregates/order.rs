//! Order Aggregate

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::aggregates::Cart;
use crate::domain::events::OrderEvent;
use crate::{pricing, Order, OrderStatus};

pub const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";

/// Delivery details captured at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomerContact {
    #[validate(length(min = 1, message = "Name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address format."))]
    pub email: String,
    #[validate(length(min = 7, message = "Phone number is too short"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Delivery address is required"))]
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub payment_method: Option<String>,
}

impl Order {
    /// Snapshots the cart into a pending order priced with the session discount.
    pub fn place(id: impl Into<String>, user_id: impl Into<String>, cart: &Cart, contact: CustomerContact, discount: i64, delivery_fee: i64) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let totals = pricing::CartTotals::compute(cart.items(), discount, delivery_fee);
        let now = Utc::now();
        Ok(Self {
            id: id.into(), user_id: user_id.into(), items: cart.items().to_vec(),
            subtotal: totals.subtotal, delivery_fee: totals.delivery_fee, discount: totals.discount, total: totals.total,
            status: OrderStatus::Pending,
            customer_name: contact.customer_name, email: contact.email, phone: contact.phone, address: contact.address,
            city: contact.city, postal_code: contact.postal_code,
            payment_method: contact.payment_method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            order_date: Some(now), updated_at: Some(now), cancelled_at: None,
        })
    }

    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    /// Short reference shown to customers, e.g. `#0192F3A1`.
    pub fn short_ref(&self) -> String {
        let head: String = self.id.chars().filter(|c| *c != '-').take(8).collect();
        format!("#{}", head.to_uppercase())
    }

    /// Customers may only withdraw orders nobody has started on.
    pub fn cancel(&mut self) -> Result<OrderEvent, OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::CannotCancel(self.status)); }
        let now = Utc::now();
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = Some(now);
        Ok(OrderEvent::Cancelled { order_id: self.id.clone(), user_id: self.user_id.clone(), at: now })
    }

    /// Admin override; any status may follow any other.
    pub fn set_status(&mut self, status: OrderStatus) -> OrderEvent {
        let now = Utc::now();
        self.status = status;
        self.updated_at = Some(now);
        OrderEvent::StatusChanged { order_id: self.id.clone(), user_id: self.user_id.clone(), status, at: now }
    }
}

/// Status tab on the order history page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderFilter { #[default] All, Status(OrderStatus) }

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self { Self::All => true, Self::Status(status) => order.status == *status }
    }

    /// Filters and sorts newest first; orders without a date sort last.
    pub fn apply(&self, orders: impl IntoIterator<Item = Order>) -> Vec<Order> {
        let mut selected: Vec<Order> = orders.into_iter().filter(|o| self.matches(o)).collect();
        selected.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        selected
    }
}

impl std::str::FromStr for OrderFilter {
    type Err = crate::ShopError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "" | "all" => Ok(Self::All), other => other.parse().map(Self::Status) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, CannotCancel(OrderStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Your cart is empty"),
            Self::CannotCancel(status) => write!(f, "Only pending orders can be cancelled (order is {status})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Product;
    use chrono::Duration;

    fn contact() -> CustomerContact {
        CustomerContact { customer_name: "Ayesha".into(), email: "ayesha@gmail.com".into(), phone: "03001234567".into(), address: "12 Mall Road".into(), ..Default::default() }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_product(&Product { id: "prod_1".into(), price: 45000, ..Default::default() });
        let chair = Product { id: "prod_4".into(), price: 12000, ..Default::default() };
        cart.add_product(&chair);
        cart.add_product(&chair);
        cart
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place("0192f3a1-aaaa", "uid-1", &cart(), contact(), 6900, 500).unwrap();
        assert_eq!(order.subtotal, 69000);
        assert_eq!(order.total, 62600);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.payment_method, DEFAULT_PAYMENT_METHOD);
        assert_eq!(order.short_ref(), "#0192F3A1");
        order.set_status(OrderStatus::Processing);
        assert_eq!(order.cancel(), Err(OrderError::CannotCancel(OrderStatus::Processing)));
        order.set_status(OrderStatus::Pending);
        assert!(matches!(order.cancel(), Ok(OrderEvent::Cancelled { .. })));
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.cancelled_at.is_some());
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(Order::place("o", "u", &Cart::new(), contact(), 0, 500), Err(OrderError::NoItems));
    }

    #[test]
    fn test_contact_validation() {
        assert!(contact().validate().is_ok());
        let bad = CustomerContact { email: "not-an-email".into(), ..contact() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_filter_sorts_newest_first() {
        let now = Utc::now();
        let older = Order { id: "a".into(), order_date: Some(now - Duration::days(2)), ..Default::default() };
        let newer = Order { id: "b".into(), order_date: Some(now), ..Default::default() };
        let shipped = Order { id: "c".into(), status: OrderStatus::Shipped, order_date: Some(now - Duration::days(1)), ..Default::default() };
        let all = OrderFilter::All.apply(vec![older.clone(), newer.clone(), shipped.clone()]);
        assert_eq!(all.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), ["b", "c", "a"]);
        let only_shipped = "shipped".parse::<OrderFilter>().unwrap().apply(vec![older, newer, shipped]);
        assert_eq!(only_shipped.len(), 1);
        assert!("lost".parse::<OrderFilter>().is_err());
    }
}
