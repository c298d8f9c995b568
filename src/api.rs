//! HTTP surface for the storefront and the admin console.
//!
//! The signed-in user is named by the `x-user-id` header, set by the gateway
//! after it has verified the session with the auth service.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_error_message, AuthFlow, SignupForm};
use crate::catalog::{parse_price_bracket, CatalogPage, ProductFilter, SortKey};
use crate::domain::aggregates::{CartError, CustomerContact, OrderError, OrderFilter};
use crate::notify::Notice;
use crate::pricing::AppliedPromo;
use crate::services::account::{PreferencesPatch, ProfileUpdate};
use crate::services::{
    CartSummary, CategoryDraft, ContactForm, Dashboard, DealDraft, DealListing, ProductDraft, ReorderOutcome, SettingsPatch, Storefront, TeamRoster,
};
use crate::store::StoreError;
use crate::{CartItem, Category, Deal, Order, OrderStatus, Preferences, Product, Result, ShopError, StoreSettings, User, WishlistItem};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub shop: Storefront,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    pub fn new(shop: Storefront) -> Self { Self { shop, nats: None } }
    pub fn with_nats(mut self, client: Option<async_nats::Client>) -> Self { self.nats = client; self }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "furniture-storefront"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/featured", get(featured_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/deals", get(list_deals))
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_to_cart))
        .route("/api/v1/cart/items/:id", delete(remove_from_cart))
        .route("/api/v1/cart/items/:id/increment", post(increase_quantity))
        .route("/api/v1/cart/items/:id/decrement", post(decrease_quantity))
        .route("/api/v1/cart/promo", post(apply_promo))
        .route("/api/v1/wishlist", get(get_wishlist))
        .route("/api/v1/wishlist/:id", post(toggle_wishlist))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/reorder", post(reorder))
        .route("/api/v1/account", get(get_profile).put(update_profile))
        .route("/api/v1/account/session", post(ensure_profile))
        .route("/api/v1/account/register", post(register))
        .route("/api/v1/account/preferences", get(get_preferences).put(update_preferences))
        .route("/api/v1/team", get(team))
        .route("/api/v1/auth/message", get(auth_message))
        .route("/api/v1/contact", post(submit_contact))
        .route("/api/v1/newsletter", post(subscribe_newsletter))
        .route("/api/v1/admin/dashboard", get(admin_dashboard))
        .route("/api/v1/admin/categories", get(admin_categories).post(admin_create_category))
        .route("/api/v1/admin/categories/:id", put(admin_update_category).delete(admin_delete_category))
        .route("/api/v1/admin/category-counts", post(admin_sync_counts))
        .route("/api/v1/admin/products", get(admin_products).post(admin_create_product))
        .route("/api/v1/admin/products/:id", put(admin_update_product).delete(admin_delete_product))
        .route("/api/v1/admin/deals", get(admin_deals).post(admin_create_deal))
        .route("/api/v1/admin/deals/:id", put(admin_update_deal).delete(admin_delete_deal))
        .route("/api/v1/admin/orders", get(admin_orders))
        .route("/api/v1/admin/orders/:id", delete(admin_delete_order))
        .route("/api/v1/admin/orders/:id/status", put(admin_order_status))
        .route("/api/v1/admin/customers", get(admin_customers))
        .route("/api/v1/admin/customers/:id", delete(admin_delete_customer))
        .route("/api/v1/admin/settings", get(admin_settings).put(admin_update_settings))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = match &self {
            ShopError::ProductNotFound | ShopError::OrderNotFound | ShopError::CategoryNotFound | ShopError::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            ShopError::Order(OrderError::CannotCancel(_)) => StatusCode::CONFLICT,
            ShopError::Order(OrderError::NoItems) | ShopError::EmptyCart | ShopError::PromoCode(_) | ShopError::InvalidPromoCode | ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::NotSignedIn => StatusCode::UNAUTHORIZED,
            ShopError::AccessDenied | ShopError::Storage(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ShopError::Mail(_) => StatusCode::BAD_GATEWAY,
            ShopError::Storage(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ShopError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() { tracing::error!(error = %self, status = status.as_u16(), "request failed"); }
        (status, Json(Notice::from(&self))).into_response()
    }
}

fn user_id(headers: &HeaderMap) -> Result<&str> {
    headers.get(USER_HEADER).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty()).ok_or(ShopError::NotSignedIn)
}

// ---- catalogue ----------------------------------------------------------------

#[derive(Debug, Default, Deserialize)] pub struct CatalogParams { pub category: Option<String>, pub price: Option<String>, pub q: Option<String>, pub sort: Option<String>, pub page: Option<usize> }
#[derive(Debug, Default, Deserialize)] pub struct StatusParams { pub status: Option<String> }

async fn list_products(State(s): State<AppState>, Query(p): Query<CatalogParams>) -> Result<Json<CatalogPage>> {
    let filter = ProductFilter { category: p.category.filter(|c| !c.is_empty()), price: parse_price_bracket(p.price.as_deref())?, query: p.q.unwrap_or_default() };
    let sort: SortKey = p.sort.as_deref().unwrap_or_default().parse()?;
    Ok(Json(s.shop.catalog_page(&filter, sort, p.page.unwrap_or(1).max(1)).await?))
}

async fn featured_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> { Ok(Json(s.shop.featured_products().await?)) }
async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> { Ok(Json(s.shop.product(&id).await?)) }
async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> { Ok(Json(s.shop.active_categories().await?)) }
async fn list_deals(State(s): State<AppState>) -> Result<Json<Vec<Deal>>> { Ok(Json(s.shop.active_deals().await?)) }

// ---- cart and wishlist --------------------------------------------------------

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct AddToCartRequest { pub product_id: String }
#[derive(Debug, Deserialize)] pub struct PromoRequest { pub code: String }

async fn get_cart(State(s): State<AppState>, h: HeaderMap) -> Result<Json<CartSummary>> { Ok(Json(s.shop.cart_summary(user_id(&h)?).await?)) }

async fn clear_cart(State(s): State<AppState>, h: HeaderMap) -> Result<Json<CartSummary>> {
    let uid = user_id(&h)?; s.shop.clear_cart(uid).await?; Ok(Json(s.shop.cart_summary(uid).await?))
}

async fn add_to_cart(State(s): State<AppState>, h: HeaderMap, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartItem>)> {
    Ok((StatusCode::CREATED, Json(s.shop.add_to_cart(user_id(&h)?, &r.product_id).await?)))
}

async fn increase_quantity(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<CartSummary>> {
    let uid = user_id(&h)?; s.shop.increase_quantity(uid, &id).await?; Ok(Json(s.shop.cart_summary(uid).await?))
}

async fn decrease_quantity(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<CartSummary>> {
    let uid = user_id(&h)?; s.shop.decrease_quantity(uid, &id).await?; Ok(Json(s.shop.cart_summary(uid).await?))
}

async fn remove_from_cart(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<CartSummary>> {
    let uid = user_id(&h)?; s.shop.remove_from_cart(uid, &id).await?; Ok(Json(s.shop.cart_summary(uid).await?))
}

async fn apply_promo(State(s): State<AppState>, h: HeaderMap, Json(r): Json<PromoRequest>) -> Result<Json<AppliedPromo>> { Ok(Json(s.shop.apply_promo(user_id(&h)?, &r.code).await?)) }

async fn get_wishlist(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<WishlistItem>>> {
    Ok(Json(s.shop.wishlist(user_id(&h)?).await?.items().to_vec()))
}

async fn toggle_wishlist(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<Notice>> {
    let added = s.shop.toggle_wishlist(user_id(&h)?, &id).await?;
    Ok(Json(if added { Notice::success("Added to wishlist") } else { Notice::info("Removed from wishlist") }))
}

// ---- orders -------------------------------------------------------------------

async fn checkout(State(s): State<AppState>, h: HeaderMap, Json(r): Json<CustomerContact>) -> Result<(StatusCode, Json<Order>)> {
    let order = s.shop.checkout(user_id(&h)?, r).await?;
    if let Some(nats) = &s.nats {
        match serde_json::to_vec(&order) {
            Ok(payload) => if let Err(e) = nats.publish("storefront.orders.placed".to_string(), payload.into()).await { tracing::warn!(error = %e, "order event not published"); },
            Err(e) => tracing::warn!(error = %e, "order event not encoded"),
        }
    }
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>, h: HeaderMap, Query(p): Query<StatusParams>) -> Result<Json<Vec<Order>>> {
    let filter: OrderFilter = p.status.as_deref().unwrap_or_default().parse()?;
    Ok(Json(s.shop.user_orders(user_id(&h)?, filter).await?))
}

async fn get_order(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<Order>> { Ok(Json(s.shop.user_order(user_id(&h)?, &id).await?)) }
async fn cancel_order(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<Order>> { Ok(Json(s.shop.cancel_order(user_id(&h)?, &id).await?)) }
async fn reorder(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<Json<ReorderOutcome>> { Ok(Json(s.shop.reorder(user_id(&h)?, &id).await?)) }

// ---- account ------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct SessionRequest { pub email: String, pub name: Option<String> }
#[derive(Debug, Deserialize)] pub struct AuthMessageParams { pub flow: AuthFlow, pub code: String }
#[derive(Debug, Deserialize)] pub struct NewsletterRequest { pub email: String }

async fn get_profile(State(s): State<AppState>, h: HeaderMap) -> Result<Json<User>> { Ok(Json(s.shop.profile(user_id(&h)?).await?)) }
async fn update_profile(State(s): State<AppState>, h: HeaderMap, Json(r): Json<ProfileUpdate>) -> Result<Json<User>> { Ok(Json(s.shop.update_profile(user_id(&h)?, r).await?)) }

async fn ensure_profile(State(s): State<AppState>, h: HeaderMap, Json(r): Json<SessionRequest>) -> Result<Json<User>> {
    Ok(Json(s.shop.ensure_profile(user_id(&h)?, &r.email, r.name.as_deref()).await?))
}

async fn register(State(s): State<AppState>, h: HeaderMap, Json(r): Json<SignupForm>) -> Result<(StatusCode, Json<User>)> {
    Ok((StatusCode::CREATED, Json(s.shop.register(user_id(&h)?, r).await?)))
}

async fn get_preferences(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Preferences>> { Ok(Json(s.shop.preferences(user_id(&h)?).await?)) }

async fn update_preferences(State(s): State<AppState>, h: HeaderMap, Json(r): Json<PreferencesPatch>) -> Result<Json<Preferences>> {
    Ok(Json(s.shop.update_preferences(user_id(&h)?, r).await?))
}

async fn team(State(s): State<AppState>) -> Result<Json<TeamRoster>> { Ok(Json(s.shop.team().await?)) }

async fn auth_message(Query(p): Query<AuthMessageParams>) -> Json<Notice> { Json(Notice::error(auth_error_message(p.flow, &p.code))) }

async fn submit_contact(State(s): State<AppState>, Json(r): Json<ContactForm>) -> Result<Json<Notice>> { Ok(Json(s.shop.submit_contact(r).await?)) }
async fn subscribe_newsletter(State(s): State<AppState>, Json(r): Json<NewsletterRequest>) -> Result<Json<Notice>> { Ok(Json(s.shop.subscribe_newsletter(&r.email).await?)) }

// ---- admin --------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct StatusUpdate { pub status: OrderStatus }

async fn admin_dashboard(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Dashboard>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.dashboard().await?))
}

async fn admin_categories(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.categories().await?))
}

async fn admin_create_category(State(s): State<AppState>, h: HeaderMap, Json(r): Json<CategoryDraft>) -> Result<(StatusCode, Json<Category>)> {
    Ok((StatusCode::CREATED, Json(s.shop.admin_console(user_id(&h).ok()).await?.save_category(None, r).await?)))
}

async fn admin_update_category(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>, Json(r): Json<CategoryDraft>) -> Result<Json<Category>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.save_category(Some(&id), r).await?))
}

async fn admin_delete_category(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<StatusCode> {
    s.shop.admin_console(user_id(&h).ok()).await?.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_sync_counts(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<(String, u32)>>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.sync_category_counts().await?))
}

async fn admin_products(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.products().await?))
}

async fn admin_create_product(State(s): State<AppState>, h: HeaderMap, Json(r): Json<ProductDraft>) -> Result<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(s.shop.admin_console(user_id(&h).ok()).await?.save_product(None, r).await?)))
}

async fn admin_update_product(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>, Json(r): Json<ProductDraft>) -> Result<Json<Product>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.save_product(Some(&id), r).await?))
}

async fn admin_delete_product(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<StatusCode> {
    s.shop.admin_console(user_id(&h).ok()).await?.delete_product(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_deals(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<DealListing>>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.deals().await?))
}

async fn admin_create_deal(State(s): State<AppState>, h: HeaderMap, Json(r): Json<DealDraft>) -> Result<(StatusCode, Json<Deal>)> {
    Ok((StatusCode::CREATED, Json(s.shop.admin_console(user_id(&h).ok()).await?.save_deal(None, r).await?)))
}

async fn admin_update_deal(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>, Json(r): Json<DealDraft>) -> Result<Json<Deal>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.save_deal(Some(&id), r).await?))
}

async fn admin_delete_deal(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<StatusCode> {
    s.shop.admin_console(user_id(&h).ok()).await?.delete_deal(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_orders(State(s): State<AppState>, h: HeaderMap, Query(p): Query<StatusParams>) -> Result<Json<Vec<Order>>> {
    let filter: OrderFilter = p.status.as_deref().unwrap_or_default().parse()?;
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.orders(filter).await?))
}

async fn admin_order_status(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>, Json(r): Json<StatusUpdate>) -> Result<Json<Order>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.update_order_status(&id, r.status).await?))
}

async fn admin_delete_order(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<StatusCode> {
    s.shop.admin_console(user_id(&h).ok()).await?.delete_order(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_customers(State(s): State<AppState>, h: HeaderMap) -> Result<Json<Vec<User>>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.customers().await?))
}

async fn admin_delete_customer(State(s): State<AppState>, h: HeaderMap, Path(id): Path<String>) -> Result<StatusCode> {
    s.shop.admin_console(user_id(&h).ok()).await?.delete_customer(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_settings(State(s): State<AppState>, h: HeaderMap) -> Result<Json<StoreSettings>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.settings().await?))
}

async fn admin_update_settings(State(s): State<AppState>, h: HeaderMap, Json(r): Json<SettingsPatch>) -> Result<Json<StoreSettings>> {
    Ok(Json(s.shop.admin_console(user_id(&h).ok()).await?.update_settings(r).await?))
}
