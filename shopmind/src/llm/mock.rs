//! Scripted LLM for tests.
//!
//! Pops one scripted step per `invoke`; when the script runs out the last
//! step repeats. A failure step turns into an `AgentError` so breaker and
//! fallback paths can be exercised without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmMessage, LlmResponse, ToolCall};

enum Step {
    Reply {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Fail(String),
}

impl Step {
    fn to_result(&self) -> Result<LlmResponse, AgentError> {
        match self {
            Step::Reply {
                content,
                tool_calls,
            } => Ok(LlmResponse {
                content: content.clone(),
                tool_calls: tool_calls.clone(),
                usage: None,
            }),
            Step::Fail(msg) => Err(AgentError::ExecutionFailed(msg.clone())),
        }
    }
}

/// Scripted [`LlmClient`] for tests.
pub struct MockLlm {
    script: Mutex<VecDeque<Step>>,
    /// Repeated once the script is exhausted.
    fallback: Step,
}

impl MockLlm {
    /// Always replies with the same content and no tool calls.
    pub fn always(content: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Step::Reply {
                content: content.into(),
                tool_calls: Vec::new(),
            },
        }
    }

    /// Always fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Step::Fail(message.into()),
        }
    }

    /// Queues a plain reply before the fallback kicks in.
    pub fn push_reply(self, content: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Step::Reply {
            content: content.into(),
            tool_calls: Vec::new(),
        });
        self
    }

    /// Queues a reply that requests the given tool calls.
    pub fn push_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.script.lock().unwrap().push_back(Step::Reply {
            content: String::new(),
            tool_calls,
        });
        self
    }

    /// Queues a failure step.
    pub fn push_failure(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Fail(message.into()));
        self
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[LlmMessage]) -> Result<LlmResponse, AgentError> {
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(s) => s.to_result(),
            None => self.fallback.to_result(),
        }
    }
}
