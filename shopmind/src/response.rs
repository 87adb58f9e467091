//! Agent response envelope.
//!
//! Every agent turn produces exactly one [`AgentResponse`]; the orchestrator
//! and the chat endpoint consume it and it is never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of one agent invocation.
///
/// Invariant: when `success` is false, `error` is non-empty and `data` is an
/// empty map. The [`AgentResponse::ok`] / [`AgentResponse::fail`]
/// constructors keep the invariant; prefer them over struct literals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub data: Map<String, Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentResponse {
    /// Successful response carrying the agent's typed data.
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: Map::new(),
        }
    }

    /// Failed response: empty data, non-empty error.
    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        debug_assert!(!error.is_empty());
        Self {
            success: false,
            data: Map::new(),
            error: Some(error),
            metadata: Map::new(),
        }
    }

    /// Attaches a metadata entry, builder-style.
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The assistant-facing text for session storage: the `answer` field when
    /// present, otherwise the whole data map stringified.
    pub fn answer_text(&self) -> String {
        match self.data.get("answer").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => serde_json::to_string(&self.data).unwrap_or_default(),
        }
    }
}
