//! Tool abstraction for the agent loop.
//!
//! Agents depend on [`ToolSource`] instead of concrete functions: the loop
//! advertises `list_tools()` to the LLM and dispatches its tool calls through
//! `call_tool`. Tool results are JSON rendered to text, which is how they
//! travel back over the LLM wire.
//!
//! Input schemas live in `specs.yaml`, embedded at compile time and parsed at
//! startup; each source picks its tools from the shared table by name.

mod catalog_tools;
mod policy_tools;
mod price_tools;
mod review_tools;

pub use catalog_tools::CatalogToolSource;
pub use policy_tools::PolicyToolSource;
pub use price_tools::{competitor_prices, PriceQuote, PriceToolSource};
pub use review_tools::ReviewToolSource;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification: name, description and a JSON Schema for arguments.
/// Deserializable from the embedded YAML table.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Result of a single tool call: JSON rendered to text for the LLM.
#[derive(Debug, Clone)]
pub struct ToolCallContent {
    pub text: String,
}

impl ToolCallContent {
    /// Renders a JSON payload into tool-result text.
    pub fn json(value: &Value) -> Self {
        Self {
            text: serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

/// Errors from listing or calling tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Tool source: list tools and call a tool by name.
///
/// One instance per agent; sources may share catalog or cache handles but
/// never each other's tool names.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Tools this source offers, for the LLM request.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError>;

    /// Executes one tool with JSON arguments.
    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<ToolCallContent, ToolError>;
}

/// Parses the embedded YAML tool table.
pub fn load_tool_specs() -> Result<Vec<ToolSpec>, ToolError> {
    serde_yaml::from_str(include_str!("specs.yaml"))
        .map_err(|e| ToolError::Execution(format!("embedded tool specs malformed: {}", e)))
}

/// Specs for the named tools, in the given order. Unknown names are skipped;
/// sources assert their own names against the table in tests.
pub fn specs_for(names: &[&str]) -> Vec<ToolSpec> {
    let table = load_tool_specs().unwrap_or_default();
    names
        .iter()
        .filter_map(|n| table.iter().find(|s| s.name == *n).cloned())
        .collect()
}

pub(crate) fn required_str(arguments: &Value, field: &str) -> Result<String, ToolError> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required field: {}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: The embedded YAML parses and every spec carries an
    /// object schema.
    #[test]
    fn embedded_specs_parse() {
        let specs = load_tool_specs().unwrap();
        assert!(specs.len() >= 9, "expected the full tool table, got {}", specs.len());
        for spec in &specs {
            assert!(!spec.name.is_empty());
            assert_eq!(
                spec.input_schema.get("type").and_then(Value::as_str),
                Some("object"),
                "schema for {} must be an object",
                spec.name
            );
        }
    }

    /// **Scenario**: specs_for selects by name and keeps caller order.
    #[test]
    fn specs_for_selects_and_orders() {
        let specs = specs_for(&["get_product_details", "get_categories"]);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "get_product_details");
        assert_eq!(specs[1].name, "get_categories");

        assert!(specs_for(&["no_such_tool"]).is_empty());
    }

    /// **Scenario**: required_str rejects missing and blank fields.
    #[test]
    fn required_str_validation() {
        let args = serde_json::json!({"name": "phone", "blank": "  "});
        assert_eq!(required_str(&args, "name").unwrap(), "phone");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "absent").is_err());
    }

    /// **Scenario**: Display of each ToolError variant contains its keyword.
    #[test]
    fn tool_error_display() {
        assert!(ToolError::NotFound("x".into()).to_string().contains("not found"));
        assert!(ToolError::InvalidArguments("y".into())
            .to_string()
            .contains("invalid"));
        assert!(ToolError::Execution("z".into()).to_string().contains("failed"));
    }
}
