//! Live storefront view for one visitor.
//!
//! Each store subscription gets a forwarding task that turns `watch` updates
//! into [`SessionInput`]s on a single channel. One reducer task owns the
//! [`StorefrontView`], applies snapshots and shopper intents in arrival order,
//! and publishes every new view on a `watch` channel. Snapshots from
//! different feeds carry no ordering guarantee relative to each other.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::catalog::{self, CatalogView, PriceBracket, SortKey};
use crate::domain::aggregates::{stale_category_counts, Cart, Wishlist};
use crate::notify::Notice;
use crate::services::write_category_counts;
use crate::store::{paths, DocumentStore, Snapshot};
use crate::{CartItem, Category, Deal, Product, WishlistItem};

const INPUT_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feed {
    Products,
    Categories,
    Deals,
    Cart,
    Wishlist,
}

/// What the shopper asked the listing to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewIntent {
    FilterCategory(Option<String>),
    FilterPrice(Option<PriceBracket>),
    Search(String),
    Sort(SortKey),
    LoadMore,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionInput {
    Snapshot(Feed, Snapshot),
    Intent(ViewIntent),
}

/// Store writes the reducer asks for after applying an input.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub category_counts: Vec<(String, u32)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorefrontView {
    pub catalog: CatalogView,
    pub featured: Vec<Product>,
    /// Active categories by name.
    pub categories: Vec<Category>,
    pub deals: Vec<Deal>,
    pub cart: Cart,
    pub wishlist: Wishlist,
    pub notice: Option<Notice>,
    all_categories: Vec<Category>,
    products_loaded: bool,
    categories_loaded: bool,
}

impl StorefrontView {
    pub fn apply(&mut self, input: SessionInput) -> Effects {
        match input {
            SessionInput::Snapshot(feed, snapshot) => self.apply_snapshot(feed, &snapshot),
            SessionInput::Intent(intent) => {
                self.apply_intent(intent);
                Effects::default()
            }
        }
    }

    fn apply_snapshot(&mut self, feed: Feed, snapshot: &Snapshot) -> Effects {
        match feed {
            Feed::Products => {
                let products: Vec<Product> = snapshot.records();
                self.featured = catalog::featured(&products);
                self.catalog.replace_products(products);
                self.products_loaded = true;
            }
            Feed::Categories => {
                self.all_categories = snapshot.records();
                let mut active: Vec<Category> = self.all_categories.iter().filter(|c| c.is_active()).cloned().collect();
                active.sort_by(|a, b| catalog::name_order(&a.name, &b.name));
                self.categories = active;
                self.categories_loaded = true;
            }
            Feed::Deals => {
                let now = chrono::Utc::now();
                self.deals = snapshot.records::<Deal>().into_iter().filter(|d| d.is_active() && !d.has_ended(now)).collect();
                return Effects::default();
            }
            Feed::Cart => {
                self.cart = Cart::from_items(snapshot.records::<CartItem>());
                return Effects::default();
            }
            Feed::Wishlist => {
                self.wishlist = Wishlist::from_items(snapshot.records::<WishlistItem>());
                return Effects::default();
            }
        }
        if !(self.products_loaded && self.categories_loaded) { return Effects::default(); }
        Effects { category_counts: stale_category_counts(&self.all_categories, self.catalog.active()) }
    }

    fn apply_intent(&mut self, intent: ViewIntent) {
        self.notice = None;
        match intent {
            ViewIntent::FilterCategory(category) => self.catalog.set_category(category),
            ViewIntent::FilterPrice(bracket) => self.catalog.set_price(bracket),
            ViewIntent::Search(query) => {
                self.catalog.search(&query);
                let query = query.trim();
                if !query.is_empty() && self.catalog.is_empty() {
                    self.notice = Some(Notice::info(format!("No products found for \"{query}\"")));
                }
            }
            ViewIntent::Sort(sort) => self.catalog.set_sort(sort),
            ViewIntent::LoadMore => {
                self.catalog.load_more();
            }
        }
    }
}

/// Running subscriptions plus the reducer. Dropping the session stops them.
pub struct StorefrontSession {
    inputs: mpsc::Sender<SessionInput>,
    view: watch::Receiver<StorefrontView>,
    tasks: Vec<JoinHandle<()>>,
}

impl StorefrontSession {
    /// Subscribes to the catalogue feeds, plus the user's cart and wishlist
    /// when someone is signed in. Must be called inside a tokio runtime.
    pub fn start(store: Arc<dyn DocumentStore>, uid: Option<&str>) -> Self {
        let (inputs, rx) = mpsc::channel(INPUT_BUFFER);
        let mut feeds = vec![
            (Feed::Products, paths::PRODUCTS.to_string()),
            (Feed::Categories, paths::CATEGORIES.to_string()),
            (Feed::Deals, paths::DEALS.to_string()),
        ];
        if let Some(uid) = uid {
            feeds.push((Feed::Cart, paths::cart(uid)));
            feeds.push((Feed::Wishlist, paths::wishlist(uid)));
        }
        let mut tasks: Vec<JoinHandle<()>> = feeds
            .into_iter()
            .map(|(feed, path)| tokio::spawn(forward(feed, store.subscribe(&path), inputs.clone())))
            .collect();
        let (view_tx, view) = watch::channel(StorefrontView::default());
        tasks.push(tokio::spawn(reduce(rx, view_tx, store)));
        tracing::debug!(uid = uid.unwrap_or("guest"), feeds = tasks.len() - 1, "storefront session started");
        Self { inputs, view, tasks }
    }

    pub async fn dispatch(&self, intent: ViewIntent) {
        if self.inputs.send(SessionInput::Intent(intent)).await.is_err() {
            tracing::warn!("storefront session already stopped");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StorefrontView> { self.view.clone() }

    pub fn current(&self) -> StorefrontView { self.view.borrow().clone() }
}

impl Drop for StorefrontSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn forward(feed: Feed, mut snapshots: watch::Receiver<Snapshot>, inputs: mpsc::Sender<SessionInput>) {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if inputs.send(SessionInput::Snapshot(feed, snapshot)).await.is_err() { break; }
        if snapshots.changed().await.is_err() { break; }
    }
}

async fn reduce(mut inputs: mpsc::Receiver<SessionInput>, view_tx: watch::Sender<StorefrontView>, store: Arc<dyn DocumentStore>) {
    let mut view = StorefrontView::default();
    while let Some(input) = inputs.recv().await {
        let effects = view.apply(input);
        if !effects.category_counts.is_empty() {
            if let Err(e) = write_category_counts(store.as_ref(), &effects.category_counts).await {
                tracing::warn!(error = %e, "could not write category counts");
            }
        }
        view_tx.send_replace(view.clone());
    }
}
