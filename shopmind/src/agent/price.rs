//! Price comparison agent.
//!
//! Resolves the product, pulls cached deterministic quotes through the price
//! tools, and has the LLM lay out a side-by-side comparison with a single
//! best deal.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map};

use crate::response::AgentResponse;
use crate::tools::PriceToolSource;

use super::runner::{parse_structured, run_tool_loop};
use super::{failure_response, Agent, AgentContext};

const AGENT_NAME: &str = "price";

const SYSTEM_PROMPT: &str = r#"You compare prices for one product across sources in an e-commerce store.
Resolve the product with search_products_by_name, then fetch quotes with get_competitor_prices.
Use only the quoted prices; never invent sources or numbers.

Reply with a single JSON object and nothing else:
{"product_id": "...", "product_name": "...", "comparison": [{"source": "...", "price": 0.0}], "best_deal": {"source": "...", "price": 0.0, "savings_pct": 0.0}, "summary": "1-2 sentences"}"#;

#[derive(Debug, Deserialize)]
struct PriceOutput {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    comparison: Vec<SourcePrice>,
    best_deal: BestDeal,
    summary: String,
}

#[derive(Debug, Deserialize, serde::Serialize)]
struct SourcePrice {
    source: String,
    price: f64,
}

#[derive(Debug, Deserialize, serde::Serialize)]
struct BestDeal {
    source: String,
    price: f64,
    #[serde(default)]
    savings_pct: f64,
}

/// Price comparison agent; see module docs.
#[derive(Default)]
pub struct PriceAgent;

impl PriceAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for PriceAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let deps = match ctx.require_deps() {
            Ok(deps) => deps,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let tools = PriceToolSource::new(deps.catalog.clone(), deps.price_cache.clone());
        let outcome =
            match run_tool_loop(deps.llm.as_ref(), &tools, SYSTEM_PROMPT, query).await {
                Ok(outcome) => outcome,
                Err(e) => return failure_response(AGENT_NAME, e),
            };

        let output = match parse_structured::<PriceOutput>(&outcome.content) {
            Ok(output) => output,
            Err(e) => return failure_response(AGENT_NAME, e),
        };

        let mut data = Map::new();
        data.insert("answer".into(), json!(output.summary));
        if let Some(id) = &output.product_id {
            data.insert("product_id".into(), json!(id));
        }
        if let Some(name) = &output.product_name {
            data.insert("product_name".into(), json!(name));
        }
        data.insert(
            "comparison".into(),
            serde_json::to_value(&output.comparison).unwrap_or_default(),
        );
        data.insert(
            "best_deal".into(),
            serde_json::to_value(&output.best_deal).unwrap_or_default(),
        );

        AgentResponse::ok(data)
            .with_meta("llm_rounds", json!(outcome.rounds))
            .with_meta("total_tokens", json!(outcome.usage.total_tokens))
    }
}
