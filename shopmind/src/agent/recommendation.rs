//! Product recommendation agent.
//!
//! Drives the catalog tools, then re-hydrates every recommended id from the
//! catalog — anything the model invented is dropped — and re-sorts by
//! relevance. In compare mode the result set is pinned to the products the
//! user named.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::response::AgentResponse;
use crate::tools::CatalogToolSource;

use super::runner::{parse_structured, run_tool_loop};
use super::{failure_response, Agent, AgentContext};

const AGENT_NAME: &str = "recommendation";

const SYSTEM_PROMPT: &str = r#"You are a product recommendation assistant for an e-commerce store.
Use the tools to find real products; never invent product ids. Respect any structured hints
(category, price bounds) and the requested result count.

When you have chosen, reply with a single JSON object and nothing else:
{"recommendations": [{"product_id": "...", "relevance": 0.0-1.0, "reason": "one sentence"}], "summary": "one or two sentences"}"#;

#[derive(Debug, Deserialize)]
struct RecommendationOutput {
    #[serde(default)]
    recommendations: Vec<RecommendedItem>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendedItem {
    product_id: String,
    #[serde(default)]
    relevance: f32,
    #[serde(default)]
    reason: String,
}

/// Recommendation agent; see module docs.
#[derive(Default)]
pub struct RecommendationAgent;

impl RecommendationAgent {
    pub fn new() -> Self {
        Self
    }

    fn build_query(query: &str, ctx: &AgentContext) -> String {
        let mut parts = vec![query.to_string()];
        if !ctx.structured_hints.is_empty() {
            parts.push(format!(
                "Structured hints: {}",
                Value::Object(ctx.structured_hints.clone())
            ));
        }
        if ctx.compare_mode {
            parts.push(
                "Compare mode: the user named specific products; recommend exactly those, \
                 scored against each other, and compare them in the summary."
                    .to_string(),
            );
        }
        parts.push(format!("Return at most {} recommendations.", ctx.max_results));
        parts.join("\n\n")
    }
}

#[async_trait]
impl Agent for RecommendationAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let deps = match ctx.require_deps() {
            Ok(deps) => deps,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let tools = CatalogToolSource::new(deps.catalog.clone())
            .with_default_limit(ctx.max_results);
        let outcome = match run_tool_loop(
            deps.llm.as_ref(),
            &tools,
            SYSTEM_PROMPT,
            &Self::build_query(query, ctx),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let output = match parse_structured::<RecommendationOutput>(&outcome.content) {
            Ok(output) => output,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        // Re-hydrate from the catalog; hallucinated ids drop out here.
        let mut hydrated: Vec<Value> = Vec::new();
        for item in output.recommendations.into_iter().take(ctx.max_results) {
            let product = match deps.catalog.get_product(&item.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => continue,
                Err(e) => return failure_response(AGENT_NAME, crate::error::AgentError::ExecutionFailed(e.to_string())),
            };
            hydrated.push(json!({
                "product": product,
                "relevance": item.relevance.clamp(0.0, 1.0),
                "reason": item.reason,
            }));
        }
        hydrated.sort_by(|a, b| {
            let ra = a["relevance"].as_f64().unwrap_or(0.0);
            let rb = b["relevance"].as_f64().unwrap_or(0.0);
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut data = Map::new();
        data.insert("total_found".into(), json!(hydrated.len()));
        data.insert("recommendations".into(), json!(hydrated));
        if let Some(summary) = output.summary {
            data.insert("answer".into(), json!(summary));
        }
        if ctx.compare_mode {
            data.insert("compare_mode".into(), json!(true));
        }

        AgentResponse::ok(data)
            .with_meta("llm_rounds", json!(outcome.rounds))
            .with_meta("total_tokens", json!(outcome.usage.total_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Deps;
    use crate::catalog::{InMemoryCatalog, Product};
    use crate::llm::MockLlm;
    use env_config::Settings;
    use std::sync::Arc;

    fn product(id: &str, name: &str, price: f64) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            description: "a phone".into(),
            price,
            brand: "Acme".into(),
            category: "smartphones".into(),
            stock: 10,
            rating: 4.5,
            image_url: None,
        }
    }

    fn ctx_with(catalog: InMemoryCatalog, llm: MockLlm) -> AgentContext {
        AgentContext::with_deps(Arc::new(Deps::new(
            Arc::new(catalog),
            Settings::default(),
            Arc::new(llm),
        )))
    }

    /// **Scenario**: Hallucinated ids are dropped and survivors re-sorted by
    /// relevance descending.
    #[tokio::test]
    async fn hydration_drops_ghosts_and_sorts() {
        let catalog = InMemoryCatalog::new()
            .with_product(product("p1", "Budget One", 299.0))
            .with_product(product("p2", "Mid Two", 450.0));
        let llm = MockLlm::always(
            r#"{"recommendations": [
                {"product_id": "p1", "relevance": 0.6, "reason": "cheap"},
                {"product_id": "ghost", "relevance": 0.99, "reason": "imaginary"},
                {"product_id": "p2", "relevance": 0.9, "reason": "balanced"}
            ], "summary": "Two solid options."}"#,
        );
        let ctx = ctx_with(catalog, llm);

        let response = RecommendationAgent::new().process("phones under 500", &ctx).await;
        assert!(response.success);
        assert_eq!(response.data["total_found"], json!(2));
        let recs = response.data["recommendations"].as_array().unwrap();
        assert_eq!(recs[0]["product"]["id"], "p2");
        assert_eq!(recs[1]["product"]["id"], "p1");
        assert_eq!(response.data["answer"], json!("Two solid options."));
    }

    /// **Scenario**: An empty catalog yields a successful zero-result
    /// response, not a failure.
    #[tokio::test]
    async fn empty_catalog_is_success() {
        let llm = MockLlm::always(r#"{"recommendations": [], "summary": "Nothing in stock."}"#);
        let ctx = ctx_with(InMemoryCatalog::new(), llm);

        let response = RecommendationAgent::new().process("anything", &ctx).await;
        assert!(response.success);
        assert_eq!(response.data["total_found"], json!(0));
    }

    /// **Scenario**: Missing deps is the canonical precondition failure.
    #[tokio::test]
    async fn missing_deps_fails() {
        let response = RecommendationAgent::new()
            .process("q", &AgentContext::default())
            .await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("dependencies not provided"));
    }

    /// **Scenario**: LLM failure surfaces as an unsuccessful response with
    /// the agent prefix.
    #[tokio::test]
    async fn llm_failure_is_wrapped() {
        let ctx = ctx_with(InMemoryCatalog::new(), MockLlm::failing("boom"));
        let response = RecommendationAgent::new().process("q", &ctx).await;
        assert!(!response.success);
        let msg = response.error.unwrap();
        assert!(msg.starts_with("recommendation error:"), "{}", msg);
    }

    /// **Scenario**: compare_mode is echoed in the data payload.
    #[tokio::test]
    async fn compare_mode_is_flagged() {
        let catalog = InMemoryCatalog::new().with_product(product("p1", "Budget One", 299.0));
        let llm = MockLlm::always(
            r#"{"recommendations": [{"product_id": "p1", "relevance": 0.8, "reason": "named"}], "summary": "s"}"#,
        );
        let mut ctx = ctx_with(catalog, llm);
        ctx.compare_mode = true;

        let response = RecommendationAgent::new().process("compare", &ctx).await;
        assert_eq!(response.data["compare_mode"], json!(true));
    }

    /// **Scenario**: Relevance values outside [0,1] are clamped.
    #[tokio::test]
    async fn relevance_is_clamped() {
        let catalog = InMemoryCatalog::new().with_product(product("p1", "Budget One", 299.0));
        let llm = MockLlm::always(
            r#"{"recommendations": [{"product_id": "p1", "relevance": 3.2, "reason": "r"}]}"#,
        );
        let ctx = ctx_with(catalog, llm);

        let response = RecommendationAgent::new().process("q", &ctx).await;
        let recs = response.data["recommendations"].as_array().unwrap();
        assert_eq!(recs[0]["relevance"].as_f64().unwrap(), 1.0);
    }
}
