//! Furniture Storefront
//!
//! Storefront and admin console core for a furniture shop whose data lives in a
//! realtime document store.
//!
//! ## Features
//! - Product catalog filtering, sorting and load-more paging
//! - Cart pricing with promo codes and a flat delivery fee
//! - Write-through cart, wishlist and order management
//! - Snapshot-driven storefront view model
//! - Admin console operations (catalog, orders, customers, settings)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod notify;
pub mod pricing;
pub mod seed;
pub mod services;
pub mod session;
pub mod store;

use domain::aggregates::{CartError, OrderError};
use domain::value_objects::PromoCodeError;

// =============================================================================
// Core Types
// =============================================================================

/// Visibility of catalog entities. Only `Active` records reach shoppers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    #[default]
    #[serde(other)]
    Inactive,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,
    /// Category id.
    pub category: String,
    pub images: Vec<String>,
    pub stock: u32,
    pub featured: bool,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub reviews: u32,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub slug: String,
    pub status: Status,
    pub product_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub status: Status,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Someone shown on the team page. Members without an `order` list first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub status: Status,
    pub social_links: BTreeMap<String, String>,
}

/// A cart line. `id` is the product (or deal) id the line was created from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,
    pub image: String,
    pub description: String,
    pub quantity: u32,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ShopError::Validation(format!("unknown order status: {s}")))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub discount: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub payment_method: String,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    Customer,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: Role,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub cart: BTreeMap<String, CartItem>,
    pub wishlist: BTreeMap<String, WishlistItem>,
    pub orders: BTreeMap<String, Order>,
    pub preferences: Preferences,
}

/// Email opt-ins under `users/{uid}/preferences`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub email_notifications: bool,
    pub promotional_emails: bool,
}

impl Default for Preferences {
    fn default() -> Self { Self { email_notifications: true, promotional_emails: false } }
}

impl User {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Name shown in the header: profile name, else the mailbox part of the email.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.email.split('@').next().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreSettings {
    pub store_name: String,
    pub currency: String,
    pub delivery_fee: i64,
    pub free_delivery_threshold: i64,
    pub tax_rate: f64,
    pub maintenance_mode: bool,
    pub social_links: BTreeMap<String, String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "Maryam's Furniture Shop".to_string(),
            currency: "PKR".to_string(),
            delivery_fee: pricing::DELIVERY_FEE,
            free_delivery_threshold: 50_000,
            tax_rate: 0.0,
            maintenance_mode: false,
            social_links: BTreeMap::new(),
        }
    }
}

/// Records stored under a generated or natural key. Snapshots of a collection
/// fill in the key when the stored document omits its own id.
pub trait Record {
    fn key(&self) -> &str;
    fn assign_key(&mut self, key: &str);
}

macro_rules! record_keyed_by_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn key(&self) -> &str { &self.id }
                fn assign_key(&mut self, key: &str) {
                    if self.id.is_empty() { self.id = key.to_string(); }
                }
            }
        )*
    };
}

record_keyed_by_id!(Product, Category, Deal, TeamMember, CartItem, WishlistItem, Order);

impl Record for User {
    fn key(&self) -> &str { &self.uid }
    fn assign_key(&mut self, key: &str) {
        if self.uid.is_empty() { self.uid = key.to_string(); }
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    PromoCode(#[from] PromoCodeError),

    #[error("Invalid promo code")]
    InvalidPromoCode,

    #[error("Add items to cart first")]
    EmptyCart,

    #[error("Please login first")]
    NotSignedIn,

    #[error("Access denied. Admin privileges required.")]
    AccessDenied,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to send message: {0}")]
    Mail(String),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StoreError),
}

/// Collapses form validation failures into the first message, in field-name order.
impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        let message = fields
            .iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Please check the form and try again".to_string());
        ShopError::Validation(message)
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
