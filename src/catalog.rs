//! Product listing: filter, sort and load-more paging over the active catalog.
//!
//! The pipeline is always filter, then sort, then slice. Nothing here is
//! indexed; every recompute is a linear scan plus a stable sort.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::{Product, ShopError};

/// Products revealed per "load more" step.
pub const PAGE_SIZE: usize = 12;
/// Size of the featured strip on the home page.
pub const FEATURED_LIMIT: usize = 8;

/// Price filter options. Bounds are inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PriceBracket {
    UpTo25k,
    From25kTo50k,
    From50kTo100k,
    From100k,
}

impl PriceBracket {
    pub const ALL: [PriceBracket; 4] = [Self::UpTo25k, Self::From25kTo50k, Self::From50kTo100k, Self::From100k];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpTo25k => "0-25000",
            Self::From25kTo50k => "25000-50000",
            Self::From50kTo100k => "50000-100000",
            Self::From100k => "100000+",
        }
    }

    pub fn contains(&self, price: i64) -> bool {
        match self {
            Self::UpTo25k => price <= 25_000,
            Self::From25kTo50k => (25_000..=50_000).contains(&price),
            Self::From50kTo100k => (50_000..=100_000).contains(&price),
            Self::From100k => price >= 100_000,
        }
    }
}

impl fmt::Display for PriceBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PriceBracket {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bracket| bracket.as_str() == s)
            .ok_or_else(|| ShopError::Validation(format!("unknown price range: {s}")))
    }
}

/// Parses the optional select value where "" means "All prices".
pub fn parse_price_bracket(value: Option<&str>) -> Result<Option<PriceBracket>, ShopError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    None,
    PriceLow,
    PriceHigh,
    Name,
}

impl FromStr for SortKey {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Self::None),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "name" => Ok(Self::Name),
            other => Err(ShopError::Validation(format!("unknown sort order: {other}"))),
        }
    }
}

/// Every predicate the shopper can switch on. An unset field matches all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub price: Option<PriceBracket>,
    pub query: String,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if product.category != category { return false; }
        }
        if let Some(bracket) = self.price {
            if !bracket.contains(product.price) { return false; }
        }
        let needle = self.query.trim().to_lowercase();
        needle.is_empty() || matches_query(product, &needle)
    }

    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        products.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

fn matches_query(product: &Product, needle: &str) -> bool {
    [&product.name, &product.description, &product.category]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Stable sort, so `SortKey::None` and ties keep snapshot order.
pub fn sort_products(products: &mut [Product], key: SortKey) {
    match key {
        SortKey::None => {}
        SortKey::PriceLow => products.sort_by_key(|p| p.price),
        SortKey::PriceHigh => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::Name => products.sort_by(|a, b| name_order(&a.name, &b.name)),
    }
}

/// Case-insensitive name order, raw bytes breaking ties.
pub fn name_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub total_matches: usize,
    pub page: usize,
    pub has_more: bool,
    /// Nothing matched the current filters ("No products found").
    pub empty: bool,
}

/// Runs the whole pipeline once; `page` counts load-more steps from 1.
pub fn query_catalog(products: &[Product], filter: &ProductFilter, sort: SortKey, page: usize) -> CatalogPage {
    let mut matches: Vec<Product> = products.iter().filter(|p| p.is_active() && filter.matches(p)).cloned().collect();
    sort_products(&mut matches, sort);
    window(matches, page)
}

fn window(mut matches: Vec<Product>, page: usize) -> CatalogPage {
    let page = page.max(1);
    let total_matches = matches.len();
    let visible = total_matches.min(page.saturating_mul(PAGE_SIZE));
    matches.truncate(visible);
    CatalogPage { products: matches, total_matches, page, has_more: total_matches > visible, empty: total_matches == 0 }
}

/// First [`FEATURED_LIMIT`] active products flagged as featured.
pub fn featured(products: &[Product]) -> Vec<Product> {
    products.iter().filter(|p| p.is_active() && p.featured).take(FEATURED_LIMIT).cloned().collect()
}

/// Listing state for one shopper: the active product set plus the filters
/// and load-more counter they have chosen.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogView {
    active: Vec<Product>,
    filter: ProductFilter,
    sort: SortKey,
    page: usize,
    matches: Vec<Product>,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self { active: Vec::new(), filter: ProductFilter::default(), sort: SortKey::None, page: 1, matches: Vec::new() }
    }
}

impl CatalogView {
    pub fn new() -> Self { Self::default() }

    /// Takes a fresh product snapshot. Filters, sort and page survive.
    pub fn replace_products(&mut self, products: impl IntoIterator<Item = Product>) {
        self.active = products.into_iter().filter(Product::is_active).collect();
        self.recompute();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filter.category = category.filter(|c| !c.is_empty());
        self.reset_page();
    }

    pub fn set_price(&mut self, price: Option<PriceBracket>) {
        self.filter.price = price;
        self.reset_page();
    }

    pub fn search(&mut self, query: &str) {
        self.filter.query = query.trim().to_string();
        self.reset_page();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.reset_page();
    }

    /// Reveals the next [`PAGE_SIZE`] products. Returns false when everything
    /// is already visible.
    pub fn load_more(&mut self) -> bool {
        if self.visible().len() >= self.matches.len() { return false; }
        self.page += 1;
        true
    }

    pub fn filter(&self) -> &ProductFilter { &self.filter }
    pub fn sort(&self) -> SortKey { self.sort }
    pub fn page_number(&self) -> usize { self.page }
    pub fn active(&self) -> &[Product] { &self.active }
    pub fn matches(&self) -> &[Product] { &self.matches }
    pub fn is_empty(&self) -> bool { self.matches.is_empty() }

    pub fn visible(&self) -> &[Product] {
        let end = self.matches.len().min(self.page.saturating_mul(PAGE_SIZE));
        &self.matches[..end]
    }

    pub fn page(&self) -> CatalogPage { window(self.matches.clone(), self.page) }

    fn reset_page(&mut self) {
        self.page = 1;
        self.recompute();
    }

    fn recompute(&mut self) {
        let mut matches = self.filter.apply(&self.active);
        sort_products(&mut matches, self.sort);
        self.matches = matches;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    fn product(id: usize, name: &str, price: i64, category: &str) -> Product {
        Product {
            id: format!("prod_{id}"),
            name: name.into(),
            description: format!("{name} for the modern home"),
            price,
            category: category.into(),
            status: Status::Active,
            ..Default::default()
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Luxury L-Shape Sofa", 85000, "cat_1"),
            product(2, "King Size Bed", 65000, "cat_2"),
            product(3, "Executive Office Desk", 45000, "cat_6"),
            product(4, "Office Chair", 12000, "cat_4"),
            product(5, "Wardrobe", 40000, "cat_5"),
            product(6, "decorative Lamp", 5000, "cat_5"),
            product(7, "Recliner", 120000, "cat_1"),
            product(8, "Bookshelf", 25000, "cat_5"),
        ]
    }

    fn many(n: usize) -> Vec<Product> {
        (0..n).map(|i| product(i, &format!("Item {i:02}"), 1000 + i as i64, "cat_1")).collect()
    }

    #[test]
    fn test_filter_applies_every_predicate() {
        let filter = ProductFilter { category: Some("cat_5".into()), price: Some(PriceBracket::UpTo25k), query: String::new() };
        let result = filter.apply(&catalog());
        assert_eq!(result.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["prod_6", "prod_8"]);
        assert!(result.iter().all(|p| p.category == "cat_5" && p.price <= 25_000));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filters = [
            ProductFilter::default(),
            ProductFilter { query: "office".into(), ..Default::default() },
            ProductFilter { price: Some(PriceBracket::From25kTo50k), ..Default::default() },
            ProductFilter { category: Some("cat_1".into()), price: Some(PriceBracket::From100k), query: "REC".into() },
        ];
        for filter in filters {
            let once = filter.apply(&catalog());
            assert_eq!(filter.apply(&once), once);
        }
    }

    #[test]
    fn test_bracket_bounds_are_inclusive() {
        assert!(PriceBracket::UpTo25k.contains(25_000));
        assert!(PriceBracket::From25kTo50k.contains(25_000));
        assert!(PriceBracket::From50kTo100k.contains(100_000));
        assert!(PriceBracket::From100k.contains(100_000));
        assert!(!PriceBracket::From100k.contains(99_999));
        assert_eq!(parse_price_bracket(Some("100000+")).unwrap(), Some(PriceBracket::From100k));
        assert_eq!(parse_price_bracket(Some("")).unwrap(), None);
        assert!(parse_price_bracket(Some("1-2")).is_err());
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_description_and_category() {
        let by_name = ProductFilter { query: "  OFFICE ".into(), ..Default::default() }.apply(&catalog());
        assert_eq!(by_name.len(), 2);
        let by_description = ProductFilter { query: "modern home".into(), ..Default::default() }.apply(&catalog());
        assert_eq!(by_description.len(), catalog().len());
        let by_category = ProductFilter { query: "cat_6".into(), ..Default::default() }.apply(&catalog());
        assert_eq!(by_category[0].id, "prod_3");
    }

    #[test]
    fn test_sort_orders() {
        let mut low = catalog();
        sort_products(&mut low, SortKey::PriceLow);
        assert!(low.windows(2).all(|w| w[0].price <= w[1].price));

        let mut high = catalog();
        sort_products(&mut high, SortKey::PriceHigh);
        assert!(high.windows(2).all(|w| w[0].price >= w[1].price));

        let mut by_name = catalog();
        sort_products(&mut by_name, SortKey::Name);
        assert!(by_name.windows(2).all(|w| name_order(&w[0].name, &w[1].name).is_le()));
        assert_eq!(by_name[0].name, "Bookshelf");
        assert_eq!(by_name[1].name, "decorative Lamp");
    }

    #[test]
    fn test_sort_keys_parse() {
        assert_eq!("".parse::<SortKey>().unwrap(), SortKey::None);
        assert_eq!("price-high".parse::<SortKey>().unwrap(), SortKey::PriceHigh);
        assert!("rating".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_empty_query_returns_active_set() {
        let mut products = catalog();
        products.push(Product { id: "hidden".into(), name: "Hidden".into(), status: Status::Inactive, ..Default::default() });
        let mut view = CatalogView::new();
        view.replace_products(products);
        view.search("sofa");
        assert_eq!(view.matches().len(), 1);
        view.search("");
        assert_eq!(view.matches(), view.active());
        assert_eq!(view.matches().len(), 8);
    }

    #[test]
    fn test_no_matches_signals_empty_state() {
        let page = query_catalog(&catalog(), &ProductFilter { query: "hammock".into(), ..Default::default() }, SortKey::None, 1);
        assert!(page.empty);
        assert!(page.products.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_load_more_extends_window() {
        let mut view = CatalogView::new();
        view.replace_products(many(30));
        assert_eq!(view.visible().len(), PAGE_SIZE);
        assert!(view.load_more());
        assert_eq!(view.visible().len(), 24);
        assert!(view.load_more());
        assert_eq!(view.visible().len(), 30);
        assert!(!view.load_more());
        assert_eq!(view.page_number(), 3);
        assert_eq!(view.visible()[0].id, "prod_0");
    }

    #[test]
    fn test_changing_filters_resets_page() {
        let mut view = CatalogView::new();
        view.replace_products(many(30));
        view.load_more();
        view.set_sort(SortKey::PriceHigh);
        assert_eq!(view.page_number(), 1);
        assert_eq!(view.visible()[0].id, "prod_29");
        view.load_more();
        view.replace_products(many(30));
        assert_eq!(view.page_number(), 2);
        assert_eq!(view.sort(), SortKey::PriceHigh);
    }

    #[test]
    fn test_sort_before_slice() {
        let page = query_catalog(&many(20), &ProductFilter::default(), SortKey::PriceHigh, 1);
        assert_eq!(page.products.len(), PAGE_SIZE);
        assert_eq!(page.products[0].id, "prod_19");
        assert!(page.has_more);
        assert_eq!(page.total_matches, 20);
    }

    #[test]
    fn test_featured_limit() {
        let mut products = many(10);
        for p in &mut products { p.featured = true; }
        products[0].status = Status::Inactive;
        let strip = featured(&products);
        assert_eq!(strip.len(), FEATURED_LIMIT);
        assert_eq!(strip[0].id, "prod_1");
    }
}
