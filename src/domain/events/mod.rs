//! Domain events
//!
//! Aggregates return these instead of touching the store; the services turn
//! each one into a write against the user's documents.
use crate::{CartItem, Order, OrderStatus, WishlistItem};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Wishlist(WishlistEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    LineSaved(CartItem),
    LineRemoved { product_id: String },
    Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WishlistEvent {
    Added(WishlistItem),
    Removed { product_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed(Order),
    StatusChanged { order_id: String, user_id: String, status: OrderStatus, at: DateTime<Utc> },
    Cancelled { order_id: String, user_id: String, at: DateTime<Utc> },
}

impl From<CartEvent> for DomainEvent { fn from(e: CartEvent) -> Self { Self::Cart(e) } }
impl From<WishlistEvent> for DomainEvent { fn from(e: WishlistEvent) -> Self { Self::Wishlist(e) } }
impl From<OrderEvent> for DomainEvent { fn from(e: OrderEvent) -> Self { Self::Order(e) } }
