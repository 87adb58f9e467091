//! LLM client abstraction for the agent tool loop.
//!
//! Agents depend on a callable that takes a message transcript and returns
//! assistant text plus optional tool calls; this module defines the trait,
//! the wire-level message type, and a mock implementation for tests.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

// Re-exported so binaries can build clients with an explicit key or base URL
// without depending on async-openai directly.
pub use async_openai::config::OpenAIConfig;

use async_trait::async_trait;

use crate::error::AgentError;

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Provider call id; echoed back on the matching tool-result message.
    pub id: Option<String>,
    /// Tool name as listed in the request's tool schemas.
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model.
    pub arguments: String,
}

/// Message on the LLM wire. Unlike stored [`crate::message::ChatMessage`],
/// this carries tool plumbing: assistant turns keep their tool calls and tool
/// results are echoed back with the originating call id.
#[derive(Debug, Clone)]
pub enum LlmMessage {
    System(String),
    User(String),
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            content: content.into(),
        }
    }
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Accumulates another call's usage into this one.
    pub fn add(&mut self, other: &LlmUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Response from one LLM completion: assistant text and optional tool calls.
///
/// An empty `tool_calls` means the model produced its final answer and the
/// loop should stop.
#[derive(Debug)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<LlmUsage>,
}

/// LLM client: given a transcript, returns assistant text and tool calls.
///
/// Implementations: [`MockLlm`] (scripted, for tests) and [`ChatOpenAI`]
/// (real API). Implementations must be safe for concurrent use; each turn is
/// an independent request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[LlmMessage]) -> Result<LlmResponse, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Message constructors build the expected variants.
    #[test]
    fn llm_message_constructors() {
        assert!(matches!(LlmMessage::system("s"), LlmMessage::System(c) if c == "s"));
        assert!(matches!(LlmMessage::user("u"), LlmMessage::User(c) if c == "u"));
        match LlmMessage::assistant("a") {
            LlmMessage::Assistant { content, tool_calls } => {
                assert_eq!(content, "a");
                assert!(tool_calls.is_empty());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        match LlmMessage::tool_result("call_1", "ok") {
            LlmMessage::Tool { call_id, content } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(content, "ok");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    /// **Scenario**: Usage accumulation sums every counter.
    #[test]
    fn usage_add_sums_counters() {
        let mut total = LlmUsage::default();
        total.add(&LlmUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        total.add(&LlmUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        });
        assert_eq!(total.prompt_tokens, 11);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, 18);
    }
}
