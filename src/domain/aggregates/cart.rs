//! Cart Aggregate

use chrono::Utc;
use crate::domain::events::{CartEvent, WishlistEvent};
use crate::{pricing, CartItem, Deal, Product, WishlistItem};

const PLACEHOLDER_IMAGE: &str = "placeholder.jpg";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from stored lines. A stored quantity of 0 counts as 1.
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let items = items
            .into_iter()
            .map(|mut item| { item.quantity = item.quantity.max(1); item })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn into_items(self) -> Vec<CartItem> { self.items }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn get(&self, product_id: &str) -> Option<&CartItem> { self.items.iter().find(|i| i.id == product_id) }
    pub fn subtotal(&self) -> i64 { pricing::subtotal(&self.items) }

    pub fn add_product(&mut self, product: &Product) -> CartEvent {
        self.add_line(CartItem {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            original_price: product.original_price,
            image: product.primary_image().unwrap_or(PLACEHOLDER_IMAGE).to_string(),
            description: product.description.clone(),
            quantity: 1,
            added_at: None,
            updated_at: None,
        })
    }

    pub fn add_deal(&mut self, deal: &Deal) -> CartEvent {
        self.add_line(CartItem {
            id: deal.id.clone(),
            name: deal.name.clone(),
            price: deal.price,
            original_price: Some(deal.original_price),
            image: deal.image.clone().unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            description: deal.description.clone(),
            quantity: 1,
            added_at: None,
            updated_at: None,
        })
    }

    fn add_line(&mut self, mut line: CartItem) -> CartEvent {
        let now = Utc::now();
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == line.id) {
            existing.quantity += 1;
            existing.updated_at = Some(now);
            return CartEvent::LineSaved(existing.clone());
        }
        line.added_at = Some(now);
        self.items.push(line.clone());
        CartEvent::LineSaved(line)
    }

    pub fn increment(&mut self, product_id: &str) -> Result<CartEvent, CartError> {
        let item = self.items.iter_mut().find(|i| i.id == product_id).ok_or(CartError::ItemNotFound)?;
        item.quantity += 1;
        item.updated_at = Some(Utc::now());
        Ok(CartEvent::LineSaved(item.clone()))
    }

    /// Lowers the quantity by one; a line already at 1 is removed instead.
    pub fn decrement(&mut self, product_id: &str) -> Result<CartEvent, CartError> {
        let item = self.items.iter_mut().find(|i| i.id == product_id).ok_or(CartError::ItemNotFound)?;
        if item.quantity > 1 {
            item.quantity -= 1;
            item.updated_at = Some(Utc::now());
            return Ok(CartEvent::LineSaved(item.clone()));
        }
        self.remove(product_id)
    }

    pub fn remove(&mut self, product_id: &str) -> Result<CartEvent, CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(CartEvent::LineRemoved { product_id: product_id.to_string() })
    }

    pub fn clear(&mut self) -> CartEvent { self.items.clear(); CartEvent::Cleared }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl Wishlist {
    pub fn from_items(items: impl IntoIterator<Item = WishlistItem>) -> Self { Self { items: items.into_iter().collect() } }
    pub fn items(&self) -> &[WishlistItem] { &self.items }
    pub fn contains(&self, product_id: &str) -> bool { self.items.iter().any(|i| i.id == product_id) }

    pub fn toggle(&mut self, product: &Product) -> WishlistEvent {
        if self.contains(&product.id) {
            self.items.retain(|i| i.id != product.id);
            return WishlistEvent::Removed { product_id: product.id.clone() };
        }
        let item = WishlistItem {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.images.first().cloned().unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            added_at: Some(Utc::now()),
        };
        self.items.push(item.clone());
        WishlistEvent::Added(item)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Item not found in cart") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sofa() -> Product {
        Product { id: "prod_1".into(), name: "Luxury L-Shape Sofa".into(), price: 45000, images: vec!["sofa.jpg".into()], ..Default::default() }
    }

    fn chair() -> Product {
        Product { id: "prod_4".into(), name: "Office Chair".into(), price: 12000, ..Default::default() }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new();
        cart.add_product(&sofa());
        cart.add_product(&chair());
        let event = cart.add_product(&chair());
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), 69000);
        match event {
            CartEvent::LineSaved(line) => { assert_eq!(line.quantity, 2); assert!(line.updated_at.is_some()); }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(cart.get("prod_4").unwrap().image, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_decrement_last_unit_removes_line() {
        let mut cart = Cart::new();
        cart.add_product(&sofa());
        cart.add_product(&chair());
        let event = cart.decrement("prod_1").unwrap();
        assert_eq!(event, CartEvent::LineRemoved { product_id: "prod_1".into() });
        assert_eq!(cart.line_count(), 1);
        assert!(cart.get("prod_1").is_none());
    }

    #[test]
    fn test_increment_then_decrement() {
        let mut cart = Cart::new();
        cart.add_product(&sofa());
        cart.increment("prod_1").unwrap();
        assert_eq!(cart.get("prod_1").unwrap().quantity, 2);
        cart.decrement("prod_1").unwrap();
        assert_eq!(cart.get("prod_1").unwrap().quantity, 1);
        assert_eq!(cart.increment("missing"), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_from_items_normalises_quantity() {
        let cart = Cart::from_items(vec![CartItem { id: "a".into(), price: 100, quantity: 0, ..Default::default() }]);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), 100);
    }

    #[test]
    fn test_wishlist_toggle() {
        let mut wishlist = Wishlist::default();
        assert!(matches!(wishlist.toggle(&sofa()), WishlistEvent::Added(_)));
        assert!(wishlist.contains("prod_1"));
        assert_eq!(wishlist.toggle(&sofa()), WishlistEvent::Removed { product_id: "prod_1".into() });
        assert!(wishlist.items().is_empty());
    }
}
