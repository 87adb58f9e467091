//! Intent classification.
//!
//! Always the first call of a turn. The classifier has no tools, one LLM
//! round, and a hard guarantee: it never fails. Any error — transport,
//! schema, anything — degrades to `general` with zero confidence and the
//! failure description as reasoning.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{LlmClient, LlmMessage};

use super::runner::parse_structured;

/// The closed set of user goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Recommendation,
    Comparison,
    Review,
    Policy,
    Price,
    General,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Recommendation => "recommendation",
            Intent::Comparison => "comparison",
            Intent::Review => "review",
            Intent::Policy => "policy",
            Intent::Price => "price",
            Intent::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output: intent, confidence and any extracted entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Clamped to [0, 1].
    pub confidence: f32,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

impl IntentResult {
    /// The degraded result used on any classification failure.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            intent: Intent::General,
            confidence: 0.0,
            product_name: None,
            category: None,
            max_price: None,
            min_price: None,
            reasoning: reason.into(),
        }
    }
}

const SYSTEM_PROMPT: &str = r#"You classify one e-commerce chat message into an intent. Reply with a single JSON object and nothing else:
{"intent": "recommendation|comparison|review|policy|price|general", "confidence": 0.0-1.0, "product_name": string or null, "category": string or null, "max_price": number or null, "min_price": number or null, "reasoning": "one short sentence"}

Intent meanings:
- recommendation: the user wants product suggestions ("show me budget phones").
- comparison: the user wants specific named products compared.
- review: the user asks what reviews or other buyers say.
- policy: returns, shipping, warranty, privacy or other store policy questions.
- price: price checks or deal hunting for a specific product.
- general: greetings, chit-chat, anything else.

Extract entities only when explicit in the message. Prices are plain numbers in USD."#;

/// LLM-backed intent classifier. Cheap by construction: no tools, single
/// round, target latency well under a second.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Classifies `query`. Never returns an error.
    pub async fn classify(&self, query: &str) -> IntentResult {
        let messages = [
            LlmMessage::system(SYSTEM_PROMPT),
            LlmMessage::user(query),
        ];

        let content = match self.llm.invoke(&messages).await {
            Ok(response) => response.content,
            Err(e) => {
                debug!(error = %e, "intent classification failed; defaulting to general");
                return IntentResult::fallback(format!("classification failed: {}", e));
            }
        };

        match parse_structured::<IntentResult>(&content) {
            Ok(mut result) => {
                result.confidence = result.confidence.clamp(0.0, 1.0);
                result
            }
            Err(e) => {
                debug!(error = %e, "intent output malformed; defaulting to general");
                IntentResult::fallback(format!("classification failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    /// **Scenario**: A well-formed classification parses with entities.
    #[tokio::test]
    async fn classify_parses_result() {
        let llm = Arc::new(MockLlm::always(
            r#"{"intent": "recommendation", "confidence": 0.92, "category": "smartphones", "max_price": 500, "reasoning": "asks for suggestions"}"#,
        ));
        let classifier = IntentClassifier::new(llm);

        let result = classifier.classify("budget smartphones under $500").await;
        assert_eq!(result.intent, Intent::Recommendation);
        assert!((result.confidence - 0.92).abs() < 1e-6);
        assert_eq!(result.category.as_deref(), Some("smartphones"));
        assert_eq!(result.max_price, Some(500.0));
    }

    /// **Scenario**: LLM failure degrades to general with zero confidence —
    /// classify never raises.
    #[tokio::test]
    async fn llm_failure_degrades_to_general() {
        let classifier = IntentClassifier::new(Arc::new(MockLlm::failing("timeout")));
        let result = classifier.classify("anything").await;
        assert_eq!(result.intent, Intent::General);
        assert_eq!(result.confidence, 0.0);
        assert!(result.reasoning.contains("timeout"));
    }

    /// **Scenario**: Malformed output also degrades to general.
    #[tokio::test]
    async fn malformed_output_degrades_to_general() {
        let classifier = IntentClassifier::new(Arc::new(MockLlm::always("sure, happy to help!")));
        let result = classifier.classify("anything").await;
        assert_eq!(result.intent, Intent::General);
        assert_eq!(result.confidence, 0.0);
    }

    /// **Scenario**: Out-of-range confidence is clamped into [0, 1].
    #[tokio::test]
    async fn confidence_is_clamped() {
        let llm = Arc::new(MockLlm::always(
            r#"{"intent": "price", "confidence": 7.5, "reasoning": "overconfident"}"#,
        ));
        let result = IntentClassifier::new(llm).classify("how much is it").await;
        assert_eq!(result.intent, Intent::Price);
        assert_eq!(result.confidence, 1.0);
    }

    /// **Scenario**: Intent serde uses the lowercase wire form.
    #[test]
    fn intent_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Intent::Policy).unwrap(), "\"policy\"");
        let i: Intent = serde_json::from_str("\"comparison\"").unwrap();
        assert_eq!(i, Intent::Comparison);
        assert_eq!(Intent::Review.to_string(), "review");
    }
}
