//! # Shopmind
//!
//! Multi-agent conversational backend for an e-commerce assistant. A user
//! message enters through one chat endpoint, an intent classifier picks a
//! goal, and the orchestrator dispatches to a specialized agent — product
//! recommendation, review summarization, price comparison, policy questions,
//! or a general fallback — each driving a typed LLM tool loop over the
//! catalog, the cache substrate and the policy vector index.
//!
//! ## Design principles
//!
//! - **One agent contract**: every agent is `process(query, context) →
//!   AgentResponse` ([`Agent`]); failures are responses, never panics.
//! - **Dependency bag**: shared resources travel in [`Deps`] inside
//!   [`AgentContext`]; agents validate presence at the top of `process`.
//! - **Best-effort caching**: the [`Cache`] substrate never errors to
//!   callers — a transport failure is a miss. Two backends (redis,
//!   in-process) behind one trait, chosen per namespace at first use.
//! - **Breaker-guarded routing**: the [`Orchestrator`] consults one
//!   [`CircuitBreaker`] per agent and degrades to the general agent instead
//!   of failing a turn.
//!
//! ## Main modules
//!
//! - [`agent`]: [`Agent`] trait, [`Deps`]/[`AgentContext`], the five
//!   specialized agents, the [`IntentClassifier`], and the shared tool loop
//!   in [`agent::runner`].
//! - [`orchestrator`]: [`Orchestrator`] — registry, synonym rewrite,
//!   breaker policy, fallback.
//! - [`breaker`]: [`CircuitBreaker`] with Closed/Open/HalfOpen states.
//! - [`cache`]: [`Cache`] trait, [`InMemoryCache`], [`RedisCache`],
//!   per-namespace process-wide handles.
//! - [`session`]: [`SessionMemory`] — sliding-window history plus query
//!   enrichment.
//! - [`catalog`]: read-only [`Catalog`] trait with SQLite and in-memory
//!   implementations.
//! - [`index`]: [`PolicyIndex`] — L2-normalized flat inner-product index
//!   with snapshot persistence; [`Embedder`] and [`OpenAIEmbedder`].
//! - [`tools`]: [`ToolSource`] trait and the per-agent tool sources.
//! - [`llm`]: [`LlmClient`] trait with [`ChatOpenAI`] and [`MockLlm`].

pub mod agent;
pub mod breaker;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod index;
pub mod llm;
pub mod message;
pub mod orchestrator;
pub mod response;
pub mod session;
pub mod tools;

pub use agent::{
    Agent, AgentContext, Deps, GeneralAgent, Intent, IntentClassifier, IntentResult,
    PolicyAgent, PriceAgent, RecommendationAgent, ReviewAgent,
};
pub use breaker::{BreakerState, CircuitBreaker};
pub use cache::{
    reset_shared_handles, shared_handle, Cache, CacheError, CacheNamespace, InMemoryCache,
    RedisCache,
};
pub use catalog::{
    Catalog, CatalogError, InMemoryCatalog, Policy, Product, ProductFilters, Review,
    ReviewStats, Sentiment, SqliteCatalog,
};
pub use error::AgentError;
pub use index::{Embedder, IndexError, OpenAIEmbedder, PolicyChunk, PolicyIndex, ScoredChunk};
pub use llm::{ChatOpenAI, LlmClient, LlmMessage, LlmResponse, LlmUsage, MockLlm, ToolCall};
pub use message::{ChatMessage, Role};
pub use orchestrator::Orchestrator;
pub use response::AgentResponse;
pub use session::SessionMemory;
pub use tools::{
    competitor_prices, CatalogToolSource, PolicyToolSource, PriceQuote, PriceToolSource,
    ReviewToolSource, ToolCallContent, ToolError, ToolSource, ToolSpec,
};
