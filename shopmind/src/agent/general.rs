//! General fallback agent.
//!
//! No tools, single LLM turn. Handles greetings and anything no specialist
//! covers, and doubles as the orchestrator's degradation target when a
//! breaker is open or an agent is unregistered.

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::llm::LlmMessage;
use crate::response::AgentResponse;

use super::{failure_response, Agent, AgentContext};

const AGENT_NAME: &str = "general";

const SYSTEM_PROMPT: &str = "You are a friendly e-commerce shopping assistant. Answer briefly. \
If the user wants recommendations, reviews, prices or policy details, invite them to ask for \
that directly. Plain text, no JSON.";

/// Fallback agent; see module docs.
#[derive(Default)]
pub struct GeneralAgent;

impl GeneralAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let deps = match ctx.require_deps() {
            Ok(deps) => deps,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let messages = [LlmMessage::system(SYSTEM_PROMPT), LlmMessage::user(query)];
        let response = match deps.llm.invoke(&messages).await {
            Ok(response) => response,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let mut data = Map::new();
        data.insert("answer".into(), json!(response.content));
        AgentResponse::ok(data).with_meta("llm_rounds", json!(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Deps;
    use crate::catalog::InMemoryCatalog;
    use crate::llm::MockLlm;
    use env_config::Settings;
    use std::sync::Arc;

    fn ctx_with(llm: MockLlm) -> AgentContext {
        AgentContext::with_deps(Arc::new(Deps::new(
            Arc::new(InMemoryCatalog::new()),
            Settings::default(),
            Arc::new(llm),
        )))
    }

    /// **Scenario**: One LLM turn, answer in data, success.
    #[tokio::test]
    async fn single_turn_answer() {
        let ctx = ctx_with(MockLlm::always("Hi! Ask me about products."));
        let response = GeneralAgent::new().process("hello", &ctx).await;
        assert!(response.success);
        assert_eq!(response.data["answer"], json!("Hi! Ask me about products."));
        assert_eq!(response.metadata["llm_rounds"], json!(1));
    }

    /// **Scenario**: LLM failure wraps with the agent prefix.
    #[tokio::test]
    async fn llm_failure_is_wrapped() {
        let ctx = ctx_with(MockLlm::failing("down"));
        let response = GeneralAgent::new().process("hello", &ctx).await;
        assert!(!response.success);
        assert!(response.error.unwrap().starts_with("general error:"));
    }

    /// **Scenario**: Missing deps is the canonical precondition failure.
    #[tokio::test]
    async fn missing_deps_fails() {
        let response = GeneralAgent::new().process("hello", &AgentContext::default()).await;
        assert_eq!(response.error.as_deref(), Some("dependencies not provided"));
    }
}
