//! Starter catalogue written into an empty store.

use chrono::Utc;
use std::collections::BTreeMap;

use crate::store::{paths, to_document, DocumentStore};
use crate::{Category, Product, Result, Status, StoreSettings};

pub fn default_categories() -> Vec<Category> {
    let now = Utc::now();
    [
        ("cat_1", "Sofas & Couches", "🛋️", "sofas-couches"),
        ("cat_2", "Beds", "🛏️", "beds"),
        ("cat_3", "Tables", "🪑", "tables"),
        ("cat_4", "Chairs", "💺", "chairs"),
        ("cat_5", "Storage", "🗄️", "storage"),
        ("cat_6", "Office Furniture", "💼", "office"),
    ]
    .into_iter()
    .map(|(id, name, icon, slug)| Category {
        id: id.into(),
        name: name.into(),
        icon: Some(icon.into()),
        slug: slug.into(),
        status: Status::Active,
        product_count: 0,
        created_at: Some(now),
    })
    .collect()
}

pub fn default_products() -> Vec<Product> {
    let now = Utc::now();
    let product = |id: &str, name: &str, description: &str, price: i64, original: i64, category: &str, image: &str, stock: u32, featured: bool, rating: f64, reviews: u32| Product {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        price,
        original_price: Some(original),
        category: category.into(),
        images: vec![format!("https://images.unsplash.com/{image}?w=500")],
        stock,
        featured,
        status: Status::Active,
        rating: Some(rating),
        reviews,
        created_at: Some(now),
        updated_at: None,
    };
    vec![
        product("prod_1", "Luxury L-Shape Sofa", "Premium quality L-shaped sofa with soft cushioning and modern design", 85000, 95000, "cat_1", "photo-1555041469-a586c61ea9bc", 10, true, 4.5, 23),
        product("prod_2", "King Size Bed", "Spacious king size bed with storage and premium mattress", 65000, 75000, "cat_2", "photo-1505693416388-ac5ce068fe85", 5, true, 4.8, 15),
        product("prod_3", "Executive Office Desk", "Modern executive desk with built-in cable management", 45000, 50000, "cat_6", "photo-1518455027359-f3f8164ba6bd", 8, false, 4.3, 12),
    ]
}

pub fn default_settings(delivery_fee: i64) -> StoreSettings {
    let social_links: BTreeMap<String, String> = ["facebook", "instagram", "twitter"]
        .into_iter()
        .map(|site| (site.to_string(), format!("https://{site}.com/maryamsfurniture")))
        .collect();
    StoreSettings { delivery_fee, social_links, ..Default::default() }
}

/// Writes each default collection that is missing. Existing data is never
/// touched. Returns the collections that were seeded.
pub async fn ensure_defaults(store: &dyn DocumentStore, delivery_fee: i64) -> Result<Vec<&'static str>> {
    let mut seeded = Vec::new();
    if !store.read(paths::CATEGORIES).await?.exists() {
        let categories: BTreeMap<String, Category> = default_categories().into_iter().map(|c| (c.id.clone(), c)).collect();
        store.set(paths::CATEGORIES, to_document(paths::CATEGORIES, &categories)?).await?;
        seeded.push(paths::CATEGORIES);
    }
    if !store.read(paths::PRODUCTS).await?.exists() {
        let products: BTreeMap<String, Product> = default_products().into_iter().map(|p| (p.id.clone(), p)).collect();
        store.set(paths::PRODUCTS, to_document(paths::PRODUCTS, &products)?).await?;
        seeded.push(paths::PRODUCTS);
    }
    if !store.read(paths::SETTINGS).await?.exists() {
        store.set(paths::SETTINGS, to_document(paths::SETTINGS, &default_settings(delivery_fee))?).await?;
        seeded.push(paths::SETTINGS);
    }
    for collection in &seeded {
        tracing::info!(collection = *collection, "seeded default data");
    }
    Ok(seeded)
}
