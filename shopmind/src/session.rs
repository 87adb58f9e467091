//! Per-session conversation memory.
//!
//! A session is a JSON array of [`ChatMessage`] held as one value in the
//! `session:` cache namespace, capped by a sliding window and refreshed to a
//! full TTL on every append. History feeds query enrichment so the LLM can
//! resolve references like "the second one".

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::cache::Cache;
use crate::message::ChatMessage;

/// Pairs retained per session; one pair is a user message plus its reply.
const DEFAULT_MAX_PAIRS: usize = 10;

/// Stored assistant content is clipped here so structured agent payloads
/// cannot balloon the session value.
const MAX_STORED_ASSISTANT_CHARS: usize = 4000;

/// Sliding-window conversation store over a cache handle.
///
/// `append_turn` is read-modify-write: two concurrent appends to the same
/// session race and the later writer keeps the whole history. Accepted —
/// sessions serve a single user and the worst case is one dropped turn.
pub struct SessionMemory {
    cache: Arc<dyn Cache>,
    ttl: Duration,
    max_pairs: usize,
}

impl SessionMemory {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            max_pairs: DEFAULT_MAX_PAIRS,
        }
    }

    /// Overrides the sliding-window cap. Build-time only.
    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = max_pairs.max(1);
        self
    }

    /// Generates a fresh session id and initializes an empty history.
    pub async fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.cache.set(&session_id, "[]", Some(self.ttl)).await;
        session_id
    }

    /// Stored messages for `session_id`, oldest first. Missing sessions and
    /// corrupt payloads both read as empty; corruption is logged.
    pub async fn get_history(&self, session_id: &str) -> Vec<ChatMessage> {
        let Some(raw) = self.cache.get(session_id).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(session_id, error = %e, "corrupt session payload; treating as empty");
                Vec::new()
            }
        }
    }

    /// Appends one user/assistant pair, trims to the window, refreshes TTL.
    pub async fn append_turn(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        let mut history = self.get_history(session_id).await;

        let mut assistant_text = assistant_text.to_string();
        if assistant_text.chars().count() > MAX_STORED_ASSISTANT_CHARS {
            assistant_text = assistant_text
                .chars()
                .take(MAX_STORED_ASSISTANT_CHARS)
                .collect();
        }

        history.push(ChatMessage::user(user_text));
        history.push(ChatMessage::assistant(assistant_text));

        // Trim whole pairs from the front, oldest first.
        let max_messages = self.max_pairs * 2;
        while history.len() > max_messages {
            history.drain(0..2);
        }

        match serde_json::to_string(&history) {
            Ok(raw) => self.cache.set(session_id, &raw, Some(self.ttl)).await,
            Err(e) => warn!(session_id, error = %e, "failed to encode session history"),
        }
    }

    /// Replaces the history with empty; returns whether the session existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let existed = self.cache.get(session_id).await.is_some();
        self.cache.set(session_id, "[]", Some(self.ttl)).await;
        existed
    }

    /// Prefixes `current_query` with the conversation so the LLM can resolve
    /// references. Empty history returns the query verbatim.
    pub fn build_enriched_query(current_query: &str, history: &[ChatMessage]) -> String {
        if history.is_empty() {
            return current_query.to_string();
        }
        let mut out = String::from("[CONVERSATION HISTORY]\n");
        for msg in history {
            out.push_str(&format!("{}: {}\n", msg.role, msg.content));
        }
        out.push_str("\n[CURRENT QUERY]\n");
        out.push_str(&format!("user: {}", current_query));
        out
    }
}
