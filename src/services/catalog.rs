//! Read side of the catalog.

use chrono::Utc;

use super::Storefront;
use crate::catalog::{self, CatalogPage, ProductFilter, SortKey};
use crate::store::paths;
use crate::{Category, Deal, Product, Result, ShopError};

impl Storefront {
    pub async fn all_products(&self) -> Result<Vec<Product>> { Ok(self.store().read(paths::PRODUCTS).await?.records()) }
    pub async fn all_categories(&self) -> Result<Vec<Category>> { Ok(self.store().read(paths::CATEGORIES).await?.records()) }
    pub async fn all_deals(&self) -> Result<Vec<Deal>> { Ok(self.store().read(paths::DEALS).await?.records()) }

    pub async fn catalog_page(&self, filter: &ProductFilter, sort: SortKey, page: usize) -> Result<CatalogPage> {
        Ok(catalog::query_catalog(&self.all_products().await?, filter, sort, page))
    }

    pub async fn featured_products(&self) -> Result<Vec<Product>> { Ok(catalog::featured(&self.all_products().await?)) }

    /// Active product by id; inactive products are hidden from shoppers.
    pub async fn product(&self, id: &str) -> Result<Product> {
        let snapshot = self.store().read(&paths::product(id)).await?;
        let mut product: Product = snapshot.val()?.ok_or(ShopError::ProductNotFound)?;
        product.id = id.to_string();
        if !product.is_active() { return Err(ShopError::ProductNotFound); }
        Ok(product)
    }

    pub async fn active_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.all_categories().await?.into_iter().filter(Category::is_active).collect();
        categories.sort_by(|a, b| catalog::name_order(&a.name, &b.name));
        Ok(categories)
    }

    /// Active deals that have not run out.
    pub async fn active_deals(&self) -> Result<Vec<Deal>> {
        let now = Utc::now();
        Ok(self.all_deals().await?.into_iter().filter(|d| d.is_active() && !d.has_ended(now)).collect())
    }
}
