//! Review summarization agent.
//!
//! Resolves the product first so the per-product summary cache can
//! short-circuit the LLM entirely; otherwise runs the review tools and
//! caches the typed digest for an hour.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::catalog::resolve_product;
use crate::error::AgentError;
use crate::response::AgentResponse;
use crate::tools::ReviewToolSource;

use super::runner::{parse_structured, run_tool_loop};
use super::{failure_response, Agent, AgentContext};

const AGENT_NAME: &str = "review";

const SYSTEM_PROMPT: &str = r#"You summarize customer reviews for one product in an e-commerce store.
Resolve the product with find_product if you only have a name, then use get_review_stats and
get_review_samples. Ground every claim in the fetched reviews.

Reply with a single JSON object and nothing else:
{"product_id": "...", "product_name": "...", "summary": "2-4 sentences", "pros": ["..."], "cons": ["..."], "total_reviews": 0, "average_rating": 0.0}"#;

#[derive(Debug, Deserialize, serde::Serialize)]
struct ReviewOutput {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    summary: String,
    #[serde(default)]
    pros: Vec<String>,
    #[serde(default)]
    cons: Vec<String>,
    #[serde(default)]
    total_reviews: i64,
    #[serde(default)]
    average_rating: f64,
}

/// Review summarization agent; see module docs.
#[derive(Default)]
pub struct ReviewAgent;

impl ReviewAgent {
    pub fn new() -> Self {
        Self
    }

    fn output_to_data(output: &ReviewOutput, cached: bool) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("answer".into(), json!(output.summary));
        data.insert(
            "review_summary".into(),
            serde_json::to_value(output).unwrap_or_default(),
        );
        data.insert("total_reviews".into(), json!(output.total_reviews));
        if cached {
            data.insert("cached".into(), json!(true));
        }
        data
    }
}

#[async_trait]
impl Agent for ReviewAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let deps = match ctx.require_deps() {
            Ok(deps) => deps,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        // Resolve the product up front when possible: a known id is the cache
        // key, and a hit skips the LLM entirely.
        let resolved_id = match &ctx.product_id {
            Some(id) => Some(id.clone()),
            None => match resolve_product(deps.catalog.as_ref(), query).await {
                Ok(Some(product)) => Some(product.id),
                _ => None,
            },
        };

        if let Some(id) = &resolved_id {
            if let Some(raw) = deps.review_cache.get(id).await {
                if let Ok(output) = serde_json::from_str::<ReviewOutput>(&raw) {
                    debug!(product_id = %id, "review summary served from cache");
                    return AgentResponse::ok(Self::output_to_data(&output, true))
                        .with_meta("llm_rounds", json!(0));
                }
            }
        }

        let tools = ReviewToolSource::new(deps.catalog.clone());
        let outcome =
            match run_tool_loop(deps.llm.as_ref(), &tools, SYSTEM_PROMPT, query).await {
                Ok(outcome) => outcome,
                Err(e) => return failure_response(AGENT_NAME, e),
            };

        let output = match parse_structured::<ReviewOutput>(&outcome.content) {
            Ok(output) => output,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let cache_key = output
            .product_id
            .clone()
            .or(resolved_id);
        if let Some(id) = cache_key {
            if let Ok(raw) = serde_json::to_string(&output) {
                deps.review_cache
                    .set(&id, &raw, Some(std::time::Duration::from_secs(3600)))
                    .await;
            }
        } else if output.total_reviews > 0 {
            return failure_response(
                AGENT_NAME,
                AgentError::InvalidOutput("summary without a product id".into()),
            );
        }

        AgentResponse::ok(Self::output_to_data(&output, false))
            .with_meta("llm_rounds", json!(outcome.rounds))
            .with_meta("total_tokens", json!(outcome.usage.total_tokens))
    }
}
