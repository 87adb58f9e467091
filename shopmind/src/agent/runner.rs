//! The LLM tool loop shared by every specialized agent.
//!
//! One round = one LLM call. When the model requests tools, each call is
//! executed and its result appended to the transcript; when it answers
//! without tool calls, the loop ends and the content is the agent's raw
//! output. The round budget bounds runaway loops; exhausting it is a failure.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmMessage, LlmUsage};
use crate::tools::ToolSource;

/// Maximum LLM rounds per agent invocation.
pub const MAX_ROUNDS: u32 = 15;

/// Final state of one loop run.
#[derive(Debug)]
pub struct LoopOutcome {
    /// The model's final message content.
    pub content: String,
    /// LLM rounds spent.
    pub rounds: u32,
    /// Aggregate token usage across all rounds.
    pub usage: LlmUsage,
}

/// Drives the LLM against a tool source until it produces a final answer.
///
/// Tool execution errors are fed back to the model as tool results rather
/// than aborting the loop; the model can retry or answer around them. Only
/// LLM failures and budget exhaustion abort.
pub async fn run_tool_loop(
    llm: &dyn LlmClient,
    tools: &dyn ToolSource,
    system_prompt: &str,
    user_query: &str,
) -> Result<LoopOutcome, AgentError> {
    let mut messages = vec![
        LlmMessage::system(system_prompt),
        LlmMessage::user(user_query),
    ];
    let mut usage = LlmUsage::default();

    for round in 1..=MAX_ROUNDS {
        let response = llm.invoke(&messages).await?;
        if let Some(u) = &response.usage {
            usage.add(u);
        }

        if response.tool_calls.is_empty() {
            debug!(rounds = round, "tool loop finished");
            return Ok(LoopOutcome {
                content: response.content,
                rounds: round,
                usage,
            });
        }

        let tool_calls = response.tool_calls.clone();
        messages.push(LlmMessage::Assistant {
            content: response.content,
            tool_calls: tool_calls.clone(),
        });

        for call in tool_calls {
            let arguments = serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| serde_json::json!({}));
            let call_id = call.id.clone().unwrap_or_else(|| call.name.clone());
            let result_text = match tools.call_tool(&call.name, arguments).await {
                Ok(content) => content.text,
                Err(e) => {
                    debug!(tool = %call.name, error = %e, "tool call failed; reported to model");
                    format!("{{\"error\": \"{}\"}}", e)
                }
            };
            messages.push(LlmMessage::tool_result(call_id, result_text));
        }
    }

    Err(AgentError::BudgetExhausted(MAX_ROUNDS))
}

/// Coerces the model's final content into the agent's typed output.
///
/// Tolerates markdown fences and prose around the JSON object; anything that
/// still fails to parse is an [`AgentError::InvalidOutput`].
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T, AgentError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AgentError::InvalidOutput(format!(
        "not parseable as the expected schema: {}",
        truncate_for_error(trimmed)
    )))
}

fn truncate_for_error(content: &str) -> String {
    const MAX: usize = 200;
    if content.chars().count() <= MAX {
        content.to_string()
    } else {
        let clipped: String = content.chars().take(MAX).collect();
        format!("{}…", clipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlm, ToolCall};
    use crate::tools::{ToolCallContent, ToolError, ToolSpec};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingTools {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ToolSource for CountingTools {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> Result<ToolCallContent, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "boom" => Err(ToolError::Execution("kaput".into())),
                _ => Ok(ToolCallContent {
                    text: "{\"ok\": true}".into(),
                }),
            }
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: Some(format!("call_{}", name)),
            name: name.into(),
            arguments: "{}".into(),
        }
    }

    /// **Scenario**: A direct answer ends the loop in one round.
    #[tokio::test]
    async fn direct_answer_is_one_round() {
        let llm = MockLlm::always("{\"answer\": \"done\"}");
        let tools = CountingTools {
            calls: AtomicU32::new(0),
        };
        let outcome = run_tool_loop(&llm, &tools, "sys", "query").await.unwrap();
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.content.contains("done"));
        assert_eq!(tools.calls.load(Ordering::SeqCst), 0);
    }

    /// **Scenario**: Tool rounds execute the requested calls before the final
    /// answer.
    #[tokio::test]
    async fn tool_rounds_execute_calls() {
        let llm = MockLlm::always("final")
            .push_tool_calls(vec![call("lookup"), call("lookup")])
            .push_tool_calls(vec![call("lookup")]);
        let tools = CountingTools {
            calls: AtomicU32::new(0),
        };
        let outcome = run_tool_loop(&llm, &tools, "sys", "query").await.unwrap();
        assert_eq!(outcome.rounds, 3);
        assert_eq!(tools.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.content, "final");
    }

    /// **Scenario**: A failing tool is reported to the model instead of
    /// aborting; the loop still completes.
    #[tokio::test]
    async fn tool_failure_feeds_back() {
        let llm = MockLlm::always("recovered").push_tool_calls(vec![call("boom")]);
        let tools = CountingTools {
            calls: AtomicU32::new(0),
        };
        let outcome = run_tool_loop(&llm, &tools, "sys", "query").await.unwrap();
        assert_eq!(outcome.content, "recovered");
    }

    /// **Scenario**: A model that never stops calling tools exhausts the
    /// budget.
    #[tokio::test]
    async fn budget_exhaustion() {
        let mut llm = MockLlm::always("unreachable");
        for _ in 0..MAX_ROUNDS {
            llm = llm.push_tool_calls(vec![call("lookup")]);
        }
        let tools = CountingTools {
            calls: AtomicU32::new(0),
        };
        let err = run_tool_loop(&llm, &tools, "sys", "query").await.unwrap_err();
        assert!(matches!(err, AgentError::BudgetExhausted(n) if n == MAX_ROUNDS));
    }

    /// **Scenario**: LLM failure aborts the loop with the underlying error.
    #[tokio::test]
    async fn llm_failure_aborts() {
        let llm = MockLlm::failing("rate limited");
        let tools = CountingTools {
            calls: AtomicU32::new(0),
        };
        let err = run_tool_loop(&llm, &tools, "sys", "query").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Out {
        answer: String,
    }

    /// **Scenario**: parse_structured accepts bare JSON, fenced JSON and JSON
    /// inside prose; rejects everything else.
    #[test]
    fn parse_structured_tolerates_wrapping() {
        let bare: Out = parse_structured("{\"answer\": \"a\"}").unwrap();
        assert_eq!(bare.answer, "a");

        let fenced: Out =
            parse_structured("```json\n{\"answer\": \"b\"}\n```").unwrap();
        assert_eq!(fenced.answer, "b");

        let prose: Out =
            parse_structured("Here you go: {\"answer\": \"c\"} — enjoy").unwrap();
        assert_eq!(prose.answer, "c");

        let err = parse_structured::<Out>("no json at all").unwrap_err();
        assert!(matches!(err, AgentError::InvalidOutput(_)));
    }
}
