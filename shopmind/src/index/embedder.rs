//! Embedding abstraction used by the policy index.

use async_trait::async_trait;

use super::IndexError;

/// Text-to-vector embedding client.
///
/// `embed` takes a batch so index builds cost one round trip.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError>;

    /// Vector dimension this embedder produces.
    fn dimension(&self) -> usize;
}

/// L2-normalizes a vector in place. Zero vectors are left untouched so a
/// degenerate embedding scores 0 against everything instead of NaN.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
