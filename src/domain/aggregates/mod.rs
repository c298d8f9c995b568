//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{category_counts, stale_category_counts};
pub use order::{CustomerContact, OrderError, OrderFilter};
pub use cart::{Cart, CartError, Wishlist};
