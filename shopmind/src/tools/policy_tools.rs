//! Policy retrieval tool over the vector index.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::index::PolicyIndex;

use super::{required_str, specs_for, ToolCallContent, ToolError, ToolSource, ToolSpec};

const TOOLS: &[&str] = &["retrieve_policy_sections"];

const DEFAULT_K: usize = 3;

/// Retrieval tool for the policy agent. The agent must answer from the
/// returned sections only.
pub struct PolicyToolSource {
    index: Arc<PolicyIndex>,
}

impl PolicyToolSource {
    pub fn new(index: Arc<PolicyIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl ToolSource for PolicyToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(specs_for(TOOLS))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolError> {
        match name {
            "retrieve_policy_sections" => {
                let query = required_str(&arguments, "query")?;
                let k = arguments
                    .get("k")
                    .and_then(Value::as_u64)
                    .map(|v| v as usize)
                    .unwrap_or(DEFAULT_K)
                    .clamp(1, 10);
                let hits = self
                    .index
                    .search(&query, k)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                let sections: Vec<Value> = hits
                    .iter()
                    .map(|h| {
                        json!({
                            "policy_type": h.chunk.policy_type,
                            "text": h.chunk.text,
                            "score": h.score,
                        })
                    })
                    .collect();
                Ok(ToolCallContent::json(&json!({ "sections": sections })))
            }
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}
