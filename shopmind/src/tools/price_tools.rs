//! Price comparison tools with a deterministic quote source.
//!
//! There is no live price feed: each source's quote is a pure function of
//! `(product_id, source, base_price)`, so repeated lookups always agree.
//! Quotes are cached for an hour under the `price:` namespace; a cache hit is
//! marked `cached: true` in the payload.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::cache::Cache;
use crate::catalog::Catalog;

use super::{required_str, specs_for, ToolCallContent, ToolError, ToolSource, ToolSpec};

const TOOLS: &[&str] = &["search_products_by_name", "get_competitor_prices"];

const QUOTE_TTL: Duration = Duration::from_secs(3600);

/// Quote sources with their price multiplier band relative to base price.
/// The in-house listing always quotes base.
const SOURCES: &[(&str, f64, f64)] = &[
    ("shopmind", 1.00, 1.00),
    ("amazon", 0.92, 1.08),
    ("bestbuy", 0.95, 1.10),
    ("walmart", 0.90, 1.05),
];

/// Competitor quotes for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub product_id: String,
    /// Source name → quoted price in USD, `.99`-rounded.
    pub prices: BTreeMap<String, f64>,
    pub best_source: String,
    pub best_price: f64,
    /// Spread between the worst and best quote, percent of the worst.
    pub savings_pct: f64,
    /// Epoch seconds when the quote was computed.
    pub cached_at: u64,
    /// True when served from the cache rather than recomputed.
    #[serde(default)]
    pub cached: bool,
}

/// FNV-1a over `product_id ∥ source`; keeps quotes reproducible without a
/// live feed.
fn source_hash(product_id: &str, source: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for b in product_id.bytes().chain([b'|']).chain(source.bytes()) {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// `.99` price convention: round up to the next dollar, minus one cent.
fn point_ninety_nine(price: f64) -> f64 {
    (price.max(1.0).ceil() - 0.01).max(0.99)
}

/// Deterministic quote computation. Pure in `(product_id, base_price)`.
pub fn competitor_prices(product_id: &str, base_price: f64) -> PriceQuote {
    let mut prices = BTreeMap::new();
    for (source, lo, hi) in SOURCES {
        let fraction = (source_hash(product_id, source) % 1000) as f64 / 999.0;
        let multiplier = lo + fraction * (hi - lo);
        prices.insert((*source).to_string(), point_ninety_nine(base_price * multiplier));
    }

    let (best_source, best_price) = prices
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(s, p)| (s.clone(), *p))
        .unwrap_or_default();
    let worst_price = prices.values().cloned().fold(best_price, f64::max);
    let savings_pct = if worst_price > 0.0 {
        ((worst_price - best_price) / worst_price * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    PriceQuote {
        product_id: product_id.to_string(),
        prices,
        best_source,
        best_price,
        savings_pct,
        cached_at: crate::cache::now_epoch_secs(),
        cached: false,
    }
}

/// Price lookup tools: product resolution plus cached deterministic quotes.
pub struct PriceToolSource {
    catalog: Arc<dyn Catalog>,
    cache: Arc<dyn Cache>,
}

impl PriceToolSource {
    pub fn new(catalog: Arc<dyn Catalog>, cache: Arc<dyn Cache>) -> Self {
        Self { catalog, cache }
    }
}

#[async_trait]
impl ToolSource for PriceToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(specs_for(TOOLS))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolError> {
        match name {
            "search_products_by_name" => {
                let query = required_str(&arguments, "name")?;
                let limit = arguments
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map(|v| v as usize)
                    .unwrap_or(5)
                    .clamp(1, 20);
                let products = self
                    .catalog
                    .search_products_by_name(&query, limit)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                Ok(ToolCallContent::json(&json!({ "products": products })))
            }
            "get_competitor_prices" => {
                let product_id = required_str(&arguments, "product_id")?;

                if let Some(raw) = self.cache.get(&product_id).await {
                    if let Ok(mut quote) = serde_json::from_str::<PriceQuote>(&raw) {
                        debug!(product_id, "price quote served from cache");
                        quote.cached = true;
                        return Ok(ToolCallContent::json(
                            &serde_json::to_value(&quote).unwrap_or_default(),
                        ));
                    }
                }

                let product = self
                    .catalog
                    .get_product(&product_id)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?
                    .ok_or_else(|| {
                        ToolError::InvalidArguments(format!("no product with id {}", product_id))
                    })?;

                let quote = competitor_prices(&product_id, product.price);
                if let Ok(raw) = serde_json::to_string(&quote) {
                    self.cache.set(&product_id, &raw, Some(QUOTE_TTL)).await;
                }
                Ok(ToolCallContent::json(
                    &serde_json::to_value(&quote).unwrap_or_default(),
                ))
            }
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}
