//! Turn orchestration: classify, route, guard, fall back.
//!
//! The orchestrator owns the agent registry and one circuit breaker per
//! registered agent. A turn is: classify the query (never fails), rewrite
//! `comparison` to `recommendation` + compare mode, enrich the context with
//! extracted entities, route to the agent if its breaker allows, otherwise
//! degrade to the general agent. The outcome is always a
//! `(AgentResponse, IntentResult)` pair; nothing propagates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info};

use crate::agent::{Agent, AgentContext, Intent, IntentClassifier, IntentResult};
use crate::breaker::CircuitBreaker;
use crate::response::AgentResponse;

struct AgentEntry {
    agent: Arc<dyn Agent>,
    breaker: CircuitBreaker,
}

/// Agent registry plus breaker policy. Stateless across turns except for
/// breaker state; safe to share behind an `Arc` between concurrent turns.
pub struct Orchestrator {
    classifier: IntentClassifier,
    registry: HashMap<Intent, AgentEntry>,
    breaker_threshold: u32,
    breaker_recovery: Duration,
}

impl Orchestrator {
    pub fn new(classifier: IntentClassifier) -> Self {
        Self {
            classifier,
            registry: HashMap::new(),
            breaker_threshold: crate::breaker::DEFAULT_FAILURE_THRESHOLD,
            breaker_recovery: crate::breaker::DEFAULT_RECOVERY_TIMEOUT,
        }
    }

    /// Overrides breaker tuning for agents registered after this call.
    pub fn with_breaker_config(mut self, threshold: u32, recovery: Duration) -> Self {
        self.breaker_threshold = threshold;
        self.breaker_recovery = recovery;
        self
    }

    /// Registers `agent` for `intent` with a fresh breaker.
    ///
    /// `comparison` is a routing synonym, never a registry key; registering
    /// it is a wiring bug and panics at startup rather than mis-routing at
    /// runtime.
    pub fn with_agent(mut self, intent: Intent, agent: Arc<dyn Agent>) -> Self {
        assert!(
            intent != Intent::Comparison,
            "comparison is rewritten to recommendation; register recommendation instead"
        );
        let breaker = CircuitBreaker::with_config(
            format!("{}:{}", intent, agent.name()),
            self.breaker_threshold,
            self.breaker_recovery,
        );
        self.registry.insert(intent, AgentEntry { agent, breaker });
        self
    }

    /// Breaker state for one intent, for tests and diagnostics.
    pub fn breaker(&self, intent: Intent) -> Option<&CircuitBreaker> {
        self.registry.get(&intent).map(|e| &e.breaker)
    }

    /// Handles one turn. Always returns; never panics on agent behavior.
    pub async fn handle(
        &self,
        query: &str,
        ctx: &mut AgentContext,
    ) -> (AgentResponse, IntentResult) {
        let intent_result = self.classifier.classify(query).await;
        debug!(
            intent = %intent_result.intent,
            confidence = intent_result.confidence,
            "intent classified"
        );

        // Synonym rewrite: comparison routes to recommendation in compare mode.
        let mut routing_key = intent_result.intent;
        if routing_key == Intent::Comparison {
            routing_key = Intent::Recommendation;
            ctx.compare_mode = true;
        }

        // Entity enrichment for the downstream agent.
        if let Some(category) = &intent_result.category {
            ctx.structured_hints.insert("category".into(), json!(category));
        }
        if let Some(max_price) = intent_result.max_price {
            ctx.structured_hints.insert("max_price".into(), json!(max_price));
        }
        if let Some(min_price) = intent_result.min_price {
            ctx.structured_hints.insert("min_price".into(), json!(min_price));
        }
        if let Some(product_name) = &intent_result.product_name {
            ctx.structured_hints
                .insert("product_name".into(), json!(product_name));
        }

        // Demote to general when unregistered or the breaker is open.
        let entry = match self.registry.get(&routing_key) {
            Some(entry) if entry.breaker.is_available() => Some(entry),
            Some(_) => {
                info!(intent = %routing_key, "breaker open; degrading to general");
                None
            }
            None => {
                debug!(intent = %routing_key, "no agent registered; degrading to general");
                None
            }
        };
        let entry = match entry.or_else(|| self.registry.get(&Intent::General)) {
            Some(entry) => entry,
            None => {
                return (
                    AgentResponse::fail("no agent available for this request"),
                    intent_result,
                );
            }
        };

        let response = entry.agent.process(query, ctx).await;
        if response.success {
            entry.breaker.record_success();
        } else {
            entry.breaker.record_failure();
        }

        let response = response.with_meta("agent_used", json!(entry.agent.name()));
        (response, intent_result)
    }
}
