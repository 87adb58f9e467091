//! Shopmind server binary: load config, wire dependencies, serve.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Settings;
use serve::app::AppState;
use shopmind::{
    cache::{shared_handle, CacheNamespace},
    catalog::{Catalog, InMemoryCatalog, SqliteCatalog},
    index::{Embedder, OpenAIEmbedder, PolicyIndex},
    llm::OpenAIConfig,
    ChatOpenAI, Deps, SessionMemory,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // env > .env > ~/.config/shopmind/config.toml
    if let Err(e) = config::load_and_apply("shopmind", None) {
        eprintln!("config load failed: {}", e);
    }
    let settings = Settings::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Catalog: SQLite when present, demo data otherwise.
    let catalog_path =
        std::env::var("CATALOG_DB_PATH").unwrap_or_else(|_| "./catalog.db".to_string());
    let catalog: Arc<dyn Catalog> = match SqliteCatalog::open(&catalog_path) {
        Ok(catalog) => {
            info!(path = %catalog_path, "catalog: sqlite");
            Arc::new(catalog)
        }
        Err(e) => {
            warn!(path = %catalog_path, error = %e, "catalog unavailable; using demo data");
            Arc::new(demo_catalog())
        }
    };

    let redis_url = settings.redis_url.as_deref();
    let session_cache = shared_handle(CacheNamespace::Session, redis_url).await;
    let price_cache = shared_handle(CacheNamespace::Price, redis_url).await;
    let review_cache = shared_handle(CacheNamespace::ReviewSummary, redis_url).await;

    let sessions = Arc::new(SessionMemory::new(
        session_cache,
        std::time::Duration::from_secs(settings.session_ttl_seconds),
    ));

    let llm: Arc<ChatOpenAI> = match &settings.openai_api_key {
        Some(key) => Arc::new(ChatOpenAI::with_config(
            OpenAIConfig::new().with_api_key(key.clone()),
            settings.openai_model.clone(),
        )),
        None => Arc::new(ChatOpenAI::new(settings.openai_model.clone())),
    };

    let embedder: Arc<dyn Embedder> = match &settings.openai_api_key {
        Some(key) => Arc::new(OpenAIEmbedder::with_config(
            OpenAIConfig::new().with_api_key(key.clone()),
            settings.embedding_model.clone(),
        )),
        None => Arc::new(OpenAIEmbedder::new(settings.embedding_model.clone())),
    };
    let policy_index = match PolicyIndex::open_or_build(
        catalog.as_ref(),
        embedder,
        &settings.vector_store_path,
    )
    .await
    {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            warn!(error = %e, "policy index unavailable; policy agent degraded");
            None
        }
    };

    let mut deps = Deps::new(catalog, settings.clone(), llm)
        .with_price_cache(price_cache)
        .with_review_cache(review_cache);
    if let Some(index) = policy_index {
        deps = deps.with_policy_index(index);
    }

    let state = Arc::new(AppState::new(Arc::new(deps), sessions));
    let addr = settings.listen_addr();
    serve::run_serve(&addr, state).await
}

/// Small built-in catalog so the server is usable without a database.
fn demo_catalog() -> InMemoryCatalog {
    use shopmind::{Policy, Product, Review, Sentiment};

    InMemoryCatalog::new()
        .with_products(vec![
            Product {
                id: "sm-100".into(),
                name: "Nimbus A1".into(),
                description: "6.1-inch budget smartphone with two-day battery".into(),
                price: 349.99,
                brand: "Nimbus".into(),
                category: "smartphones".into(),
                stock: 42,
                rating: 4.3,
                image_url: None,
            },
            Product {
                id: "sm-200".into(),
                name: "Nimbus Pro X".into(),
                description: "flagship camera phone".into(),
                price: 999.99,
                brand: "Nimbus".into(),
                category: "smartphones".into(),
                stock: 7,
                rating: 4.7,
                image_url: None,
            },
            Product {
                id: "au-300".into(),
                name: "EchoBuds Lite".into(),
                description: "wireless earbuds with noise isolation".into(),
                price: 79.99,
                brand: "Echo Audio".into(),
                category: "audio".into(),
                stock: 120,
                rating: 4.1,
                image_url: None,
            },
        ])
        .with_review(Review {
            product_id: "sm-100".into(),
            rating: 5,
            text: "Battery really does last two days.".into(),
            date: "2025-06-14".into(),
            sentiment: Sentiment::Positive,
        })
        .with_review(Review {
            product_id: "sm-100".into(),
            rating: 2,
            text: "Camera struggles in low light.".into(),
            date: "2025-06-20".into(),
            sentiment: Sentiment::Negative,
        })
        .with_policy(Policy {
            policy_type: "returns".into(),
            description: "Items can be returned within 30 days of delivery".into(),
            conditions: "unused, in original packaging, with receipt".into(),
            timeframe: "30 days".into(),
        })
        .with_policy(Policy {
            policy_type: "shipping".into(),
            description: "Free standard shipping on orders over $50".into(),
            conditions: "continental addresses only".into(),
            timeframe: "5-7 business days".into(),
        })
}
