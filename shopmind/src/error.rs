//! Agent execution error types.
//!
//! Internal to the agent runtime: every variant is caught at the agent
//! boundary and converted into an unsuccessful [`AgentResponse`]
//! (`crate::response::AgentResponse`) before it can reach the orchestrator.

use thiserror::Error;

/// Agent execution error.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, tool error).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The dependency bag was absent from the call context.
    #[error("dependencies not provided")]
    MissingDependencies,

    /// The LLM/tool round budget was exhausted before a final answer.
    #[error("round budget exhausted after {0} rounds")]
    BudgetExhausted(u32),

    /// The model's final output could not be coerced to the agent's schema.
    #[error("invalid structured output: {0}")]
    InvalidOutput(String),
}
