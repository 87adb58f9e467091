//! Agent runtime contract.
//!
//! Every specialized agent exposes the same operation:
//! `process(query, context) → AgentResponse`. Agents are stateless; all
//! shared resources travel in the [`Deps`] bag inside [`AgentContext`].
//! Internally each agent drives the LLM tool loop in [`runner`] against its
//! own [`crate::tools::ToolSource`] until a typed output is produced.

mod general;
mod intent;
mod policy;
mod price;
mod recommendation;
mod review;
pub mod runner;

pub use general::GeneralAgent;
pub use intent::{Intent, IntentClassifier, IntentResult};
pub use policy::PolicyAgent;
pub use price::PriceAgent;
pub use recommendation::RecommendationAgent;
pub use review::ReviewAgent;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::cache::{Cache, InMemoryCache};
use crate::catalog::Catalog;
use crate::error::AgentError;
use crate::index::PolicyIndex;
use crate::llm::LlmClient;
use crate::response::AgentResponse;
use env_config::Settings;

/// Shared dependency bag. Built once at startup and cloned by Arc into every
/// turn's context.
pub struct Deps {
    pub catalog: Arc<dyn Catalog>,
    pub settings: Settings,
    pub llm: Arc<dyn LlmClient>,
    /// Present only when the policy agent is deployed.
    pub policy_index: Option<Arc<PolicyIndex>>,
    /// `price:` namespace handle.
    pub price_cache: Arc<dyn Cache>,
    /// `review_summary:` namespace handle.
    pub review_cache: Arc<dyn Cache>,
}

impl Deps {
    /// Minimal bag with private in-memory caches and no policy index.
    pub fn new(catalog: Arc<dyn Catalog>, settings: Settings, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            catalog,
            settings,
            llm,
            policy_index: None,
            price_cache: Arc::new(InMemoryCache::new().with_key_prefix("price:")),
            review_cache: Arc::new(InMemoryCache::new().with_key_prefix("review_summary:")),
        }
    }

    pub fn with_policy_index(mut self, index: Arc<PolicyIndex>) -> Self {
        self.policy_index = Some(index);
        self
    }

    pub fn with_price_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.price_cache = cache;
        self
    }

    pub fn with_review_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.review_cache = cache;
        self
    }
}

/// Per-turn call context handed to `Agent::process`.
#[derive(Clone)]
pub struct AgentContext {
    pub deps: Option<Arc<Deps>>,
    pub session_id: Option<String>,
    /// Pre-resolved product for agents that accept one (review, price).
    pub product_id: Option<String>,
    pub max_results: usize,
    /// Set when a `comparison` intent was rewritten to `recommendation`.
    pub compare_mode: bool,
    /// Entities extracted by the intent classifier (category, price bounds).
    pub structured_hints: Map<String, Value>,
}

impl Default for AgentContext {
    fn default() -> Self {
        Self {
            deps: None,
            session_id: None,
            product_id: None,
            max_results: 5,
            compare_mode: false,
            structured_hints: Map::new(),
        }
    }
}

impl AgentContext {
    pub fn with_deps(deps: Arc<Deps>) -> Self {
        Self {
            deps: Some(deps),
            ..Self::default()
        }
    }

    /// The dependency bag, or the precondition error every agent reports the
    /// same way.
    pub fn require_deps(&self) -> Result<Arc<Deps>, AgentError> {
        self.deps.clone().ok_or(AgentError::MissingDependencies)
    }
}

/// The uniform agent operation. `process` never returns an error and never
/// panics: every internal failure becomes an unsuccessful [`AgentResponse`].
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, query: &str, ctx: &AgentContext) -> AgentResponse;
}

/// Maps an internal error to the response contract: missing deps keep their
/// canonical message, everything else is prefixed with the agent name.
pub(crate) fn failure_response(agent_name: &str, err: AgentError) -> AgentResponse {
    match err {
        AgentError::MissingDependencies => AgentResponse::fail("dependencies not provided"),
        other => AgentResponse::fail(format!("{} error: {}", agent_name, other)),
    }
}
