//! Catalog records: products, deals and the categories that group them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use crate::domain::value_objects::round_half_up;
use crate::{Category, Deal, Product, Status};

/// Percentage saved going from `original` to `price`, rounded half up.
///
/// `None` when there is no meaningful original price (zero or negative).
pub fn discount_percent(original: i64, price: i64) -> Option<i64> {
    if original <= 0 { return None; }
    let ratio = Decimal::from(original - price) / Decimal::from(original) * Decimal::ONE_HUNDRED;
    Some(round_half_up(ratio))
}

impl Product {
    pub fn is_active(&self) -> bool { self.status == Status::Active }

    /// Discount badge value; 0 when the product has no original price.
    pub fn discount_percent(&self) -> i64 {
        self.original_price.and_then(|original| discount_percent(original, self.price)).unwrap_or(0)
    }

    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }
}

impl Deal {
    pub fn is_active(&self) -> bool { self.status == Status::Active }
    pub fn discount_percent(&self) -> Option<i64> { discount_percent(self.original_price, self.price) }
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool { self.end_time.is_some_and(|end| end <= now) }
}

impl Category {
    pub fn is_active(&self) -> bool { self.status == Status::Active }
}

/// Active products per category id.
pub fn category_counts<'a>(products: impl IntoIterator<Item = &'a Product>) -> HashMap<&'a str, u32> {
    let mut counts = HashMap::new();
    for product in products.into_iter().filter(|p| p.is_active() && !p.category.is_empty()) {
        *counts.entry(product.category.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Categories whose stored `productCount` disagrees with the live count,
/// paired with the count that should be written back.
pub fn stale_category_counts<'a>(categories: impl IntoIterator<Item = &'a Category>, products: impl IntoIterator<Item = &'a Product>) -> Vec<(String, u32)> {
    let counts = category_counts(products);
    categories
        .into_iter()
        .filter_map(|c| {
            let live = counts.get(c.id.as_str()).copied().unwrap_or(0);
            (c.product_count != live).then(|| (c.id.clone(), live))
        })
        .collect()
}
