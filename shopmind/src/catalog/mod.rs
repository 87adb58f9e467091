//! Read-only catalog interface.
//!
//! The product/review/policy store is an external collaborator; the core only
//! reads it. [`Catalog`] is the seam: agents and tools depend on the trait,
//! backed by SQLite in deployments ([`SqliteCatalog`]) and by an in-memory
//! fixture in tests ([`InMemoryCatalog`]).

mod memory;
mod sqlite;

pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog access errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// One catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub brand: String,
    pub category: String,
    pub stock: i64,
    pub rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Review sentiment label as stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// One product review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub product_id: String,
    /// 1–5 stars.
    pub rating: i64,
    pub text: String,
    pub date: String,
    pub sentiment: Sentiment,
}

/// Aggregate review counts for one product (single SQL aggregate in the
/// sqlite backend).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total: i64,
    pub average_rating: f64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

/// One store policy row; becomes one chunk in the policy index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub policy_type: String,
    pub description: String,
    pub conditions: String,
    pub timeframe: String,
}

/// Structured product search filters, from intent entities or tool arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilters {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_rating: Option<f64>,
}

/// Read-only catalog operations used by the agents' tools.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Products matching the structured filters, best rating first.
    async fn search_products(
        &self,
        filters: &ProductFilters,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError>;

    /// Case-insensitive name substring search, best rating first.
    async fn search_products_by_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<Product>, CatalogError>;

    /// One product by id.
    async fn get_product(&self, id: &str) -> Result<Option<Product>, CatalogError>;

    /// Distinct category names.
    async fn categories(&self) -> Result<Vec<String>, CatalogError>;

    /// Review aggregate for one product. Zeroed stats when there are none.
    async fn review_stats(&self, product_id: &str) -> Result<ReviewStats, CatalogError>;

    /// Up to `limit` review texts with the given sentiment, newest first.
    async fn review_samples(
        &self,
        product_id: &str,
        sentiment: Sentiment,
        limit: usize,
    ) -> Result<Vec<Review>, CatalogError>;

    /// All policy rows.
    async fn policies(&self) -> Result<Vec<Policy>, CatalogError>;

    /// Number of policy rows; drives the index rebuild decision.
    async fn policy_count(&self) -> Result<usize, CatalogError>;
}

/// Fuzzy product resolution shared by the review and price tools: exact
/// case-insensitive name match wins, else the best-rated substring match.
pub async fn resolve_product(
    catalog: &dyn Catalog,
    name: &str,
) -> Result<Option<Product>, CatalogError> {
    let candidates = catalog.search_products_by_name(name, 10).await?;
    if candidates.is_empty() {
        return Ok(None);
    }
    let lowered = name.to_lowercase();
    let exact = candidates
        .iter()
        .find(|p| p.name.to_lowercase() == lowered)
        .cloned();
    Ok(exact.or_else(|| candidates.into_iter().next()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Sentiment serializes lowercase, matching catalog rows.
    #[test]
    fn sentiment_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "\"positive\"");
        let s: Sentiment = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(s, Sentiment::Neutral);
    }

    /// **Scenario**: resolve_product prefers an exact name hit over the
    /// top-rated substring match.
    #[tokio::test]
    async fn resolve_product_prefers_exact_match() {
        let catalog = InMemoryCatalog::new()
            .with_product(Product {
                id: "p1".into(),
                name: "Pixel Pro Case".into(),
                description: "case".into(),
                price: 29.0,
                brand: "Acme".into(),
                category: "accessories".into(),
                stock: 5,
                rating: 4.9,
                image_url: None,
            })
            .with_product(Product {
                id: "p2".into(),
                name: "Pixel Pro".into(),
                description: "phone".into(),
                price: 899.0,
                brand: "Google".into(),
                category: "smartphones".into(),
                stock: 3,
                rating: 4.5,
                image_url: None,
            });

        let hit = resolve_product(&catalog, "pixel pro").await.unwrap().unwrap();
        assert_eq!(hit.id, "p2");

        let miss = resolve_product(&catalog, "walkman").await.unwrap();
        assert!(miss.is_none());
    }
}
