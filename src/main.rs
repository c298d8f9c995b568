use std::sync::Arc;

use anyhow::Result;
use furniture_storefront::api::{self, AppState};
use furniture_storefront::config::StoreConfig;
use furniture_storefront::seed;
use furniture_storefront::services::Storefront;
use furniture_storefront::store::{paths, DocumentStore, MemoryStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHANGE_FEEDS: [&str; 4] = [paths::PRODUCTS, paths::CATEGORIES, paths::DEALS, paths::ORDERS];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = StoreConfig::from_env()?;

    let store = Arc::new(MemoryStore::new());
    if config.seed_defaults {
        let seeded = seed::ensure_defaults(store.as_ref(), config.delivery_fee).await?;
        tracing::info!(collections = ?seeded, "store seeded");
    }
    let nats = match &config.nats_url {
        Some(url) => async_nats::connect(url.as_str()).await.map_err(|e| tracing::warn!(error = %e, "NATS unavailable, change feed disabled")).ok(),
        None => None,
    };
    if let Some(client) = &nats { spawn_change_feeds(store.clone(), client.clone()); }

    let shop = Storefront::new(store).with_delivery_fee(config.delivery_fee);
    let app = api::router(AppState::new(shop).with_nats(nats));

    let addr = config.socket_addr();
    tracing::info!("🚀 Furniture storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

/// Republishes every snapshot of the shared collections on `storefront.<collection>`.
fn spawn_change_feeds(store: Arc<MemoryStore>, nats: async_nats::Client) {
    for collection in CHANGE_FEEDS {
        let mut rx = store.subscribe(collection);
        let nats = nats.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let payload = rx.borrow_and_update().value.clone().unwrap_or_default();
                let subject = format!("storefront.{collection}");
                if let Err(e) = nats.publish(subject, payload.to_string().into()).await {
                    tracing::warn!(collection, error = %e, "change not published");
                }
            }
        });
    }
}
