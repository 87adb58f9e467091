//! Review tools for the summarization agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::{resolve_product, Catalog, Sentiment};

use super::{required_str, specs_for, ToolCallContent, ToolError, ToolSource, ToolSpec};

const TOOLS: &[&str] = &["find_product", "get_review_stats", "get_review_samples"];

/// Sample caps per sentiment bucket.
const POSITIVE_SAMPLES: usize = 10;
const NEGATIVE_SAMPLES: usize = 10;
const NEUTRAL_SAMPLES: usize = 5;

/// Review texts are clipped to this many characters before reaching the LLM.
const SAMPLE_MAX_CHARS: usize = 200;

/// Review lookup tools over the read-only catalog.
pub struct ReviewToolSource {
    catalog: Arc<dyn Catalog>,
}

impl ReviewToolSource {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn clip(text: &str) -> String {
        if text.chars().count() <= SAMPLE_MAX_CHARS {
            text.to_string()
        } else {
            text.chars().take(SAMPLE_MAX_CHARS).collect()
        }
    }
}

#[async_trait]
impl ToolSource for ReviewToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(specs_for(TOOLS))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolError> {
        match name {
            "find_product" => {
                let name = required_str(&arguments, "name")?;
                let hit = resolve_product(self.catalog.as_ref(), &name)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                match hit {
                    Some(p) => Ok(ToolCallContent::json(&json!({
                        "product_id": p.id,
                        "name": p.name,
                        "rating": p.rating,
                    }))),
                    None => Ok(ToolCallContent::json(&json!({
                        "product_id": Value::Null,
                        "note": format!("no product matching '{}'", name),
                    }))),
                }
            }
            "get_review_stats" => {
                let product_id = required_str(&arguments, "product_id")?;
                let stats = self
                    .catalog
                    .review_stats(&product_id)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                Ok(ToolCallContent::json(&json!({ "stats": stats })))
            }
            "get_review_samples" => {
                let product_id = required_str(&arguments, "product_id")?;
                let mut samples = json!({});
                for (label, sentiment, cap) in [
                    ("positive", Sentiment::Positive, POSITIVE_SAMPLES),
                    ("negative", Sentiment::Negative, NEGATIVE_SAMPLES),
                    ("neutral", Sentiment::Neutral, NEUTRAL_SAMPLES),
                ] {
                    let reviews = self
                        .catalog
                        .review_samples(&product_id, sentiment, cap)
                        .await
                        .map_err(|e| ToolError::Execution(e.to_string()))?;
                    let texts: Vec<String> =
                        reviews.iter().map(|r| Self::clip(&r.text)).collect();
                    samples[label] = json!(texts);
                }
                Ok(ToolCallContent::json(&samples))
            }
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, Product, Review};

    fn catalog_with_reviews(review_count: usize) -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new().with_product(Product {
            id: "p1".into(),
            name: "Budget Phone".into(),
            description: "cheap".into(),
            price: 299.0,
            brand: "Acme".into(),
            category: "smartphones".into(),
            stock: 12,
            rating: 4.2,
            image_url: None,
        });
        for i in 0..review_count {
            catalog = catalog.with_review(Review {
                product_id: "p1".into(),
                rating: 5,
                text: format!("positive review number {}", i),
                date: format!("2025-03-{:02}", (i % 28) + 1),
                sentiment: Sentiment::Positive,
            });
        }
        catalog
    }

    /// **Scenario**: find_product resolves fuzzy names to a product id.
    #[tokio::test]
    async fn find_product_resolves() {
        let source = ReviewToolSource::new(Arc::new(catalog_with_reviews(0)));
        let content = source
            .call_tool("find_product", json!({"name": "budget"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(payload["product_id"], "p1");

        let content = source
            .call_tool("find_product", json!({"name": "walkman"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(&content.text).unwrap();
        assert!(payload["product_id"].is_null());
    }

    /// **Scenario**: Samples cap at 10 positive even when more exist, and
    /// long texts are clipped to 200 chars.
    #[tokio::test]
    async fn samples_capped_and_clipped() {
        let long_text = "x".repeat(500);
        let catalog = catalog_with_reviews(15).with_review(Review {
            product_id: "p1".into(),
            rating: 1,
            text: long_text,
            date: "2025-03-30".into(),
            sentiment: Sentiment::Negative,
        });
        let source = ReviewToolSource::new(Arc::new(catalog));

        let content = source
            .call_tool("get_review_samples", json!({"product_id": "p1"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(payload["positive"].as_array().unwrap().len(), 10);
        assert_eq!(payload["negative"].as_array().unwrap().len(), 1);
        assert_eq!(
            payload["negative"][0].as_str().unwrap().chars().count(),
            SAMPLE_MAX_CHARS
        );
        assert_eq!(payload["neutral"].as_array().unwrap().len(), 0);
    }

    /// **Scenario**: Stats for a product without reviews are zeroed, not an
    /// error.
    #[tokio::test]
    async fn stats_for_unreviewed_product() {
        let source = ReviewToolSource::new(Arc::new(catalog_with_reviews(0)));
        let content = source
            .call_tool("get_review_stats", json!({"product_id": "p1"}))
            .await
            .unwrap();
        let payload: Value = serde_json::from_str(&content.text).unwrap();
        assert_eq!(payload["stats"]["total"], 0);
    }
}
