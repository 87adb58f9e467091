//! Policy retrieval engine: embedding, cosine search, persistence.
//!
//! Each catalog policy row becomes one chunk; chunk texts are embedded in a
//! single batched call, L2-normalized and held in a flat inner-product index.
//! The index snapshots to disk and reloads when its element count still
//! matches the catalog's policy row count.

mod embedder;
mod openai_embedder;
mod policy_index;

pub use embedder::Embedder;
pub use openai_embedder::OpenAIEmbedder;
pub use policy_index::{PolicyIndex, ScoredChunk};

#[cfg(test)]
pub(crate) use embedder::test_support;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index and embedding errors.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("index io: {0}")]
    Io(#[from] std::io::Error),
    #[error("index snapshot malformed: {0}")]
    Snapshot(String),
    #[error("catalog read failed: {0}")]
    Catalog(String),
}

/// One indexed policy chunk: a policy row rendered to embeddable text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyChunk {
    /// Position of the source row at build time.
    pub policy_id: usize,
    pub policy_type: String,
    /// `policy_type: description\nconditions` — the embedded text.
    pub text: String,
    pub description: String,
    pub conditions: String,
}

impl PolicyChunk {
    /// Renders a catalog policy row into its chunk form.
    pub fn from_policy(policy_id: usize, policy: &crate::catalog::Policy) -> Self {
        let text = format!(
            "{}: {}\n{}",
            policy.policy_type, policy.description, policy.conditions
        );
        Self {
            policy_id,
            policy_type: policy.policy_type.clone(),
            text,
            description: policy.description.clone(),
            conditions: policy.conditions.clone(),
        }
    }
}
