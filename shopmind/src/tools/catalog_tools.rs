//! Catalog tools for the recommendation agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::{Catalog, ProductFilters};

use super::{required_str, specs_for, ToolCallContent, ToolError, ToolSource, ToolSpec};

const TOOLS: &[&str] = &[
    "search_products_by_filters",
    "get_product_details",
    "get_categories",
];

/// Product discovery tools over the read-only catalog.
pub struct CatalogToolSource {
    catalog: Arc<dyn Catalog>,
    default_limit: usize,
}

impl CatalogToolSource {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            default_limit: 5,
        }
    }

    /// Default result count when the model omits `limit`.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.clamp(1, 20);
        self
    }

    fn limit_from(&self, arguments: &Value) -> usize {
        arguments
            .get("limit")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(self.default_limit)
            .clamp(1, 20)
    }
}

#[async_trait]
impl ToolSource for CatalogToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(specs_for(TOOLS))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolError> {
        match name {
            "search_products_by_filters" => {
                let filters: ProductFilters = serde_json::from_value(arguments.clone())
                    .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
                let limit = self.limit_from(&arguments);
                let products = self
                    .catalog
                    .search_products(&filters, limit)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                let total_found = products.len();
                Ok(ToolCallContent::json(&json!({
                    "products": products,
                    "total_found": total_found,
                })))
            }
            "get_product_details" => {
                let product_id = required_str(&arguments, "product_id")?;
                let product = self
                    .catalog
                    .get_product(&product_id)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                match product {
                    Some(p) => Ok(ToolCallContent::json(&json!({ "product": p }))),
                    None => Ok(ToolCallContent::json(&json!({
                        "product": Value::Null,
                        "note": format!("no product with id {}", product_id),
                    }))),
                }
            }
            "get_categories" => {
                let categories = self
                    .catalog
                    .categories()
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                Ok(ToolCallContent::json(&json!({ "categories": categories })))
            }
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}
