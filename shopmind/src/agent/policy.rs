//! Policy question agent (retrieval-grounded).
//!
//! Answers only from sections retrieved out of the policy vector index. With
//! no index or an empty one, it answers honestly that no policy text is
//! available — that is a successful response, not a failure.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::response::AgentResponse;
use crate::tools::PolicyToolSource;

use super::runner::{parse_structured, run_tool_loop};
use super::{failure_response, Agent, AgentContext};

const AGENT_NAME: &str = "policy";

const SYSTEM_PROMPT: &str = r#"You answer store policy questions (returns, shipping, warranty, privacy).
Always call retrieve_policy_sections first and answer ONLY from the returned text. If the
sections do not cover the question, say so; never improvise policy.

Reply with a single JSON object and nothing else:
{"answer": "...", "sources": ["policy_type", ...], "confidence": "high|medium|low"}"#;

#[derive(Debug, Deserialize)]
struct PolicyOutput {
    answer: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence: String,
}

fn default_confidence() -> String {
    "low".to_string()
}

/// Policy agent; see module docs.
#[derive(Default)]
pub struct PolicyAgent;

impl PolicyAgent {
    pub fn new() -> Self {
        Self
    }

    fn no_policy_response() -> AgentResponse {
        let mut data = Map::new();
        data.insert(
            "answer".into(),
            json!("No policy information is available right now; please contact support."),
        );
        data.insert("sources".into(), Value::Array(Vec::new()));
        data.insert("confidence".into(), json!("low"));
        AgentResponse::ok(data).with_meta("llm_rounds", json!(0))
    }
}

#[async_trait]
impl Agent for PolicyAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let deps = match ctx.require_deps() {
            Ok(deps) => deps,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let index = match &deps.policy_index {
            Some(index) if !index.is_empty() => index.clone(),
            _ => return Self::no_policy_response(),
        };

        let tools = PolicyToolSource::new(index);
        let outcome =
            match run_tool_loop(deps.llm.as_ref(), &tools, SYSTEM_PROMPT, query).await {
                Ok(outcome) => outcome,
                Err(e) => return failure_response(AGENT_NAME, e),
            };

        let output = match parse_structured::<PolicyOutput>(&outcome.content) {
            Ok(output) => output,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let confidence = match output.confidence.as_str() {
            "high" | "medium" | "low" => output.confidence,
            _ => default_confidence(),
        };

        let mut data = Map::new();
        data.insert("answer".into(), json!(output.answer));
        data.insert("sources".into(), json!(output.sources));
        data.insert("confidence".into(), json!(confidence));

        AgentResponse::ok(data)
            .with_meta("llm_rounds", json!(outcome.rounds))
            .with_meta("total_tokens", json!(outcome.usage.total_tokens))
    }
}
