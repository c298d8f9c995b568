//! Admin console: catalogue maintenance, order handling, customers and
//! store settings. Every operation goes through [`AdminConsole`], which can
//! only be obtained for a user whose role is admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::{write_category_counts, Storefront};
use crate::auth::require_admin;
use crate::domain::aggregates::{stale_category_counts, OrderFilter};
use crate::domain::value_objects::Slug;
use crate::store::{paths, to_document};
use crate::{Category, Deal, Order, OrderStatus, Product, Result, Role, ShopError, Status, StoreSettings, User};

const PLACEHOLDER_IMAGE: &str = "placeholder.jpg";
const RECENT_ORDERS: usize = 5;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryDraft {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub icon: Option<String>,
    /// Derived from the name when blank.
    pub slug: Option<String>,
    pub status: Status,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Please choose a category"))]
    pub category: String,
    pub description: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    pub original_price: Option<i64>,
    pub stock: u32,
    pub image: Option<String>,
    pub featured: bool,
    pub status: Status,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct DealDraft {
    #[validate(length(min = 1, message = "Deal name is required"))]
    pub name: String,
    pub description: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub original_price: i64,
    pub image: Option<String>,
    pub status: Status,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Fields an admin may change in the store settings. Unset fields are kept.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_mode: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealListing {
    #[serde(flatten)]
    pub deal: Deal,
    pub discount_percent: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_orders: usize,
    pub total_revenue: i64,
    pub total_customers: usize,
    pub total_products: usize,
    pub recent_orders: Vec<Order>,
}

pub struct AdminConsole<'a> {
    shop: &'a Storefront,
    admin: User,
}

impl Storefront {
    /// Opens the console for `uid`, refusing anyone who is not an admin.
    pub async fn admin_console(&self, uid: Option<&str>) -> Result<AdminConsole<'_>> {
        let user = match uid {
            Some(uid) => self.profile(uid).await.ok(),
            None => None,
        };
        let admin = require_admin(user.as_ref())?.clone();
        Ok(AdminConsole { shop: self, admin })
    }
}

impl AdminConsole<'_> {
    pub fn admin(&self) -> &User { &self.admin }

    // ---- categories ----------------------------------------------------------

    pub async fn categories(&self) -> Result<Vec<Category>> { self.shop.all_categories().await }

    pub async fn save_category(&self, id: Option<&str>, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let mut category = match id {
            Some(id) => self.category(id).await?,
            None => Category { id: self.shop.store().new_key(), created_at: Some(Utc::now()), ..Default::default() },
        };
        category.slug = match draft.slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(slug) => slug,
            None => Slug::from_name(&draft.name).into_inner(),
        };
        category.name = draft.name.trim().to_string();
        category.icon = draft.icon.filter(|i| !i.is_empty());
        category.status = draft.status;
        let path = paths::category(&category.id);
        self.shop.store().set(&path, to_document(&path, &category)?).await?;
        tracing::info!(admin = %self.admin.uid, category_id = %category.id, "category saved");
        Ok(category)
    }

    /// Products keep pointing at a deleted category.
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        self.category(id).await?;
        self.shop.store().remove(&paths::category(id)).await?;
        tracing::info!(admin = %self.admin.uid, category_id = id, "category deleted");
        Ok(())
    }

    async fn category(&self, id: &str) -> Result<Category> {
        let mut category: Category = self.shop.store().read(&paths::category(id)).await?.val()?.ok_or(ShopError::CategoryNotFound)?;
        category.id = id.to_string();
        Ok(category)
    }

    /// Rewrites every stored product count that no longer matches the active
    /// products. Returns the counts that changed.
    pub async fn sync_category_counts(&self) -> Result<Vec<(String, u32)>> {
        let categories = self.shop.all_categories().await?;
        let products = self.shop.all_products().await?;
        let stale = stale_category_counts(&categories, &products);
        write_category_counts(self.shop.store(), &stale).await?;
        Ok(stale)
    }

    // ---- products ------------------------------------------------------------

    pub async fn products(&self) -> Result<Vec<Product>> { self.shop.all_products().await }

    pub async fn save_product(&self, id: Option<&str>, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let now = Utc::now();
        let mut product = match id {
            Some(id) => {
                let mut existing: Product = self.shop.store().read(&paths::product(id)).await?.val()?.ok_or(ShopError::ProductNotFound)?;
                existing.id = id.to_string();
                existing
            }
            None => Product { id: self.shop.store().new_key(), created_at: Some(now), rating: Some(0.0), ..Default::default() },
        };
        product.name = draft.name.trim().to_string();
        product.category = draft.category;
        product.description = draft.description;
        product.price = draft.price;
        product.original_price = draft.original_price.filter(|p| *p > 0);
        product.stock = draft.stock;
        product.images = vec![draft.image.filter(|i| !i.is_empty()).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())];
        product.featured = draft.featured;
        product.status = draft.status;
        product.updated_at = Some(now);
        let path = paths::product(&product.id);
        self.shop.store().set(&path, to_document(&path, &product)?).await?;
        tracing::info!(admin = %self.admin.uid, product_id = %product.id, "product saved");
        self.sync_category_counts().await?;
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        if !self.shop.store().read(&paths::product(id)).await?.exists() { return Err(ShopError::ProductNotFound); }
        self.shop.store().remove(&paths::product(id)).await?;
        tracing::info!(admin = %self.admin.uid, product_id = id, "product deleted");
        self.sync_category_counts().await?;
        Ok(())
    }

    // ---- deals ---------------------------------------------------------------

    pub async fn deals(&self) -> Result<Vec<DealListing>> {
        Ok(self.shop.all_deals().await?.into_iter().map(|deal| DealListing { discount_percent: deal.discount_percent(), deal }).collect())
    }

    pub async fn save_deal(&self, id: Option<&str>, draft: DealDraft) -> Result<Deal> {
        draft.validate()?;
        let id = match id {
            Some(id) => {
                if !self.shop.store().read(&paths::deal(id)).await?.exists() { return Err(ShopError::ProductNotFound); }
                id.to_string()
            }
            None => self.shop.store().new_key(),
        };
        let deal = Deal {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: draft.price,
            original_price: draft.original_price,
            image: draft.image.filter(|i| !i.is_empty()),
            status: draft.status,
            end_time: draft.end_time,
        };
        let path = paths::deal(&deal.id);
        self.shop.store().set(&path, to_document(&path, &deal)?).await?;
        tracing::info!(admin = %self.admin.uid, deal_id = %deal.id, "deal saved");
        Ok(deal)
    }

    pub async fn delete_deal(&self, id: &str) -> Result<()> {
        self.shop.store().remove(&paths::deal(id)).await?;
        Ok(())
    }

    // ---- orders --------------------------------------------------------------

    pub async fn orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.shop.store().read(paths::ORDERS).await?.records();
        Ok(filter.apply(orders))
    }

    /// Sets any status on any order, in the shop copy and the customer's.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let mut order = self.order(order_id).await?;
        let event = order.set_status(status);
        self.shop.persist(&order.user_id, event).await?;
        tracing::info!(admin = %self.admin.uid, order_id, %status, "order status updated");
        Ok(order)
    }

    pub async fn delete_order(&self, order_id: &str) -> Result<()> {
        let order = self.order(order_id).await?;
        let mut fields = Map::new();
        fields.insert(paths::order(order_id), Value::Null);
        if !order.user_id.is_empty() { fields.insert(paths::user_order(&order.user_id, order_id), Value::Null); }
        self.shop.store().update("", fields).await?;
        tracing::info!(admin = %self.admin.uid, order_id, "order deleted");
        Ok(())
    }

    async fn order(&self, order_id: &str) -> Result<Order> {
        let mut order: Order = self.shop.store().read(&paths::order(order_id)).await?.val()?.ok_or(ShopError::OrderNotFound)?;
        order.id = order_id.to_string();
        Ok(order)
    }

    // ---- customers -----------------------------------------------------------

    pub async fn customers(&self) -> Result<Vec<User>> {
        let users: Vec<User> = self.shop.store().read(paths::USERS).await?.records();
        Ok(users.into_iter().filter(|u| u.role == Role::Customer).collect())
    }

    pub async fn delete_customer(&self, uid: &str) -> Result<()> {
        if uid == self.admin.uid { return Err(ShopError::Validation("You cannot delete your own account".into())); }
        self.shop.store().remove(&paths::user(uid)).await?;
        tracing::info!(admin = %self.admin.uid, uid, "customer deleted");
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let orders = self.orders(OrderFilter::All).await?;
        Ok(Dashboard {
            total_orders: orders.len(),
            total_revenue: orders.iter().map(|o| o.total).sum(),
            total_customers: self.customers().await?.len(),
            total_products: self.shop.all_products().await?.len(),
            recent_orders: orders.into_iter().take(RECENT_ORDERS).collect(),
        })
    }

    // ---- settings ------------------------------------------------------------

    pub async fn settings(&self) -> Result<StoreSettings> { self.shop.settings().await }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<StoreSettings> {
        let fields = match to_document(paths::SETTINGS, &patch)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        if !fields.is_empty() { self.shop.store().update(paths::SETTINGS, fields).await?; }
        tracing::info!(admin = %self.admin.uid, "settings updated");
        self.settings().await
    }
}

impl Storefront {
    /// Stored settings, or the defaults with the configured delivery fee when
    /// none have been saved.
    pub async fn settings(&self) -> Result<StoreSettings> {
        let stored: Option<StoreSettings> = self.store().read(paths::SETTINGS).await?.val()?;
        Ok(stored.unwrap_or_else(|| StoreSettings { delivery_fee: self.delivery_fee(), ..Default::default() }))
    }
}
