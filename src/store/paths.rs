//! Document paths.

pub const PRODUCTS: &str = "products";
pub const CATEGORIES: &str = "categories";
pub const DEALS: &str = "deals";
pub const ORDERS: &str = "orders";
pub const SETTINGS: &str = "settings";
pub const CONTACTS: &str = "contacts";
pub const NEWSLETTER: &str = "newsletter";
pub const USERS: &str = "users";
pub const TEAM: &str = "team";

pub fn join(base: &str, key: &str) -> String {
    match (base.trim_matches('/'), key.trim_matches('/')) {
        ("", key) => key.to_string(),
        (base, "") => base.to_string(),
        (base, key) => format!("{base}/{key}"),
    }
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> { path.split('/').filter(|s| !s.is_empty()) }

/// True when one path is equal to, above or below the other.
pub fn related(a: &str, b: &str) -> bool { segments(a).zip(segments(b)).all(|(x, y)| x == y) }

pub fn product(id: &str) -> String { join(PRODUCTS, id) }
pub fn category(id: &str) -> String { join(CATEGORIES, id) }
pub fn deal(id: &str) -> String { join(DEALS, id) }
pub fn order(id: &str) -> String { join(ORDERS, id) }
pub fn user(uid: &str) -> String { join(USERS, uid) }
pub fn cart(uid: &str) -> String { format!("{}/cart", user(uid)) }
pub fn cart_line(uid: &str, product_id: &str) -> String { join(&cart(uid), product_id) }
pub fn wishlist(uid: &str) -> String { format!("{}/wishlist", user(uid)) }
pub fn wishlist_item(uid: &str, product_id: &str) -> String { join(&wishlist(uid), product_id) }
pub fn preferences(uid: &str) -> String { format!("{}/preferences", user(uid)) }
pub fn user_orders(uid: &str) -> String { format!("{}/orders", user(uid)) }
pub fn user_order(uid: &str, order_id: &str) -> String { join(&user_orders(uid), order_id) }
