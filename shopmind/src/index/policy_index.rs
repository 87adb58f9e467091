//! Flat inner-product index over policy chunks, with on-disk snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;

use super::embedder::l2_normalize;
use super::{Embedder, IndexError, PolicyChunk};

const INDEX_FILE: &str = "faiss_index.bin";
const METADATA_FILE: &str = "faiss_metadata.json";
const SNAPSHOT_MAGIC: &[u8; 4] = b"SMPI";

/// One search hit: the chunk plus its inner-product score. Vectors are
/// L2-normalized at build time, so the score is cosine similarity in [-1, 1].
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: PolicyChunk,
    pub score: f32,
}

/// Flat inner-product index over policy chunks.
///
/// Immutable after construction; share as `Arc<PolicyIndex>` and read
/// concurrently without locking. A rebuild produces a fresh instance.
pub struct PolicyIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<PolicyChunk>,
    embedder: Arc<dyn Embedder>,
}

impl PolicyIndex {
    /// Builds the index from the catalog's policy rows: one chunk per row,
    /// one batched embedding call, vectors normalized before indexing.
    pub async fn build(
        catalog: &dyn Catalog,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IndexError> {
        let policies = catalog
            .policies()
            .await
            .map_err(|e| IndexError::Catalog(e.to_string()))?;
        let chunks: Vec<PolicyChunk> = policies
            .iter()
            .enumerate()
            .map(|(i, p)| PolicyChunk::from_policy(i, p))
            .collect();

        let dim = embedder.dimension();
        if chunks.is_empty() {
            info!("policy index built empty: no policy rows");
            return Ok(Self {
                dim,
                vectors: Vec::new(),
                chunks,
                embedder,
            });
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let mut vectors = embedder.embed(&texts).await?;
        for v in vectors.iter_mut() {
            if v.len() != dim {
                return Err(IndexError::Embedding(format!(
                    "embedding dimension {} does not match index dimension {}",
                    v.len(),
                    dim
                )));
            }
            l2_normalize(v);
        }

        info!(chunks = chunks.len(), dim, "policy index built");
        Ok(Self {
            dim,
            vectors,
            chunks,
            embedder,
        })
    }

    /// Loads the snapshot if its element count matches the catalog's current
    /// policy row count; otherwise rebuilds and re-persists.
    pub async fn open_or_build(
        catalog: &dyn Catalog,
        embedder: Arc<dyn Embedder>,
        dir: impl AsRef<Path>,
    ) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        let expected = catalog
            .policy_count()
            .await
            .map_err(|e| IndexError::Catalog(e.to_string()))?;

        match Self::load(dir, Arc::clone(&embedder)) {
            Ok(Some(index)) if index.len() == expected => {
                info!(chunks = index.len(), "policy index loaded from snapshot");
                return Ok(index);
            }
            Ok(Some(index)) => {
                debug!(
                    snapshot = index.len(),
                    catalog = expected,
                    "policy index snapshot stale; rebuilding"
                );
            }
            Ok(None) => debug!("no policy index snapshot; building"),
            Err(e) => warn!(error = %e, "policy index snapshot unreadable; rebuilding"),
        }

        let index = Self::build(catalog, embedder).await?;
        if let Err(e) = index.save(dir) {
            warn!(error = %e, "failed to persist policy index snapshot");
        }
        Ok(index)
    }

    /// Writes the snapshot pair: binary vectors plus metadata JSON.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), IndexError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut blob: Vec<u8> =
            Vec::with_capacity(12 + self.vectors.len() * self.dim * 4);
        blob.extend_from_slice(SNAPSHOT_MAGIC);
        blob.extend_from_slice(&(self.dim as u32).to_le_bytes());
        blob.extend_from_slice(&(self.vectors.len() as u32).to_le_bytes());
        for v in &self.vectors {
            for x in v {
                blob.extend_from_slice(&x.to_le_bytes());
            }
        }
        std::fs::write(dir.join(INDEX_FILE), blob)?;

        let metadata = serde_json::to_string(&self.chunks)
            .map_err(|e| IndexError::Snapshot(e.to_string()))?;
        std::fs::write(dir.join(METADATA_FILE), metadata)?;
        Ok(())
    }

    /// Reads the snapshot pair. `Ok(None)` when either file is missing.
    pub fn load(
        dir: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Option<Self>, IndexError> {
        let dir = dir.as_ref();
        let index_path: PathBuf = dir.join(INDEX_FILE);
        let metadata_path: PathBuf = dir.join(METADATA_FILE);
        if !index_path.is_file() || !metadata_path.is_file() {
            return Ok(None);
        }

        let blob = std::fs::read(&index_path)?;
        if blob.len() < 12 || &blob[0..4] != SNAPSHOT_MAGIC {
            return Err(IndexError::Snapshot("bad header".into()));
        }
        let dim = u32::from_le_bytes(blob[4..8].try_into().unwrap_or_default()) as usize;
        let count = u32::from_le_bytes(blob[8..12].try_into().unwrap_or_default()) as usize;
        let expected_len = 12 + dim * count * 4;
        if blob.len() != expected_len {
            return Err(IndexError::Snapshot(format!(
                "expected {} bytes for {}x{}, found {}",
                expected_len,
                count,
                dim,
                blob.len()
            )));
        }

        let mut vectors = Vec::with_capacity(count);
        let mut offset = 12;
        for _ in 0..count {
            let mut v = Vec::with_capacity(dim);
            for _ in 0..dim {
                let bytes: [u8; 4] = blob[offset..offset + 4]
                    .try_into()
                    .map_err(|_| IndexError::Snapshot("truncated vector data".into()))?;
                v.push(f32::from_le_bytes(bytes));
                offset += 4;
            }
            vectors.push(v);
        }

        let metadata = std::fs::read_to_string(&metadata_path)?;
        let chunks: Vec<PolicyChunk> = serde_json::from_str(&metadata)
            .map_err(|e| IndexError::Snapshot(format!("metadata: {}", e)))?;
        if chunks.len() != count {
            return Err(IndexError::Snapshot(format!(
                "metadata has {} chunks, index has {}",
                chunks.len(),
                count
            )));
        }

        Ok(Some(Self {
            dim,
            vectors,
            chunks,
            embedder,
        }))
    }

    /// Top-`min(k, N)` chunks by inner product against the embedded query,
    /// sorted by score descending. An empty index returns no hits.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut embedded = self.embedder.embed(&[query]).await?;
        let mut query_vec = embedded
            .pop()
            .ok_or_else(|| IndexError::Embedding("no vector returned".into()))?;
        l2_normalize(&mut query_vec);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let dot: f32 = v.iter().zip(query_vec.iter()).map(|(a, b)| a * b).sum();
                (i, dot)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.vectors.len()));

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Index vector dimension.
    pub fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, Policy};
    use crate::index::test_support::HashEmbedder;

    fn policy(policy_type: &str, description: &str) -> Policy {
        Policy {
            policy_type: policy_type.into(),
            description: description.into(),
            conditions: "standard conditions".into(),
            timeframe: "30 days".into(),
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_policy(policy("returns", "30-day return window for unused items"))
            .with_policy(policy("shipping", "free shipping on orders over fifty dollars"))
            .with_policy(policy("warranty", "one year limited warranty"))
    }

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashEmbedder { dimension: 64 })
    }

    /// **Scenario**: Search returns at most k hits with scores in [-1, 1],
    /// sorted descending; the matching policy ranks first.
    #[tokio::test]
    async fn search_scores_sorted_and_bounded() {
        let index = PolicyIndex::build(&catalog(), embedder()).await.unwrap();
        assert_eq!(index.len(), 3);

        let hits = index
            .search("returns: 30-day return window for unused items", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        for h in &hits {
            assert!(
                h.score >= -1.0 - 1e-6 && h.score <= 1.0 + 1e-6,
                "score out of range: {}",
                h.score
            );
        }
        assert_eq!(hits[0].chunk.policy_type, "returns");
    }

    /// **Scenario**: k larger than N clamps; empty index returns nothing.
    #[tokio::test]
    async fn search_clamps_k_and_handles_empty() {
        let index = PolicyIndex::build(&catalog(), embedder()).await.unwrap();
        let hits = index.search("anything", 50).await.unwrap();
        assert_eq!(hits.len(), 3);

        let empty = PolicyIndex::build(&InMemoryCatalog::new(), embedder())
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert!(empty.search("anything", 3).await.unwrap().is_empty());
    }

    /// **Scenario**: Persisting then reloading yields identical search results
    /// for the same query and embedder.
    #[tokio::test]
    async fn snapshot_roundtrip_preserves_search() {
        let dir = tempfile::tempdir().unwrap();
        let built = PolicyIndex::build(&catalog(), embedder()).await.unwrap();
        built.save(dir.path()).unwrap();

        let loaded = PolicyIndex::load(dir.path(), embedder()).unwrap().unwrap();
        assert_eq!(loaded.len(), built.len());
        assert_eq!(loaded.dimension(), built.dimension());

        let q = "free shipping threshold";
        let a = built.search(q, 3).await.unwrap();
        let b = loaded.search(q, 3).await.unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.chunk.policy_id, y.chunk.policy_id);
            assert!((x.score - y.score).abs() < 1e-6);
        }
    }

    /// **Scenario**: open_or_build reuses a matching snapshot and rebuilds on
    /// a count mismatch.
    #[tokio::test]
    async fn open_or_build_count_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let first = PolicyIndex::open_or_build(&catalog(), embedder(), dir.path())
            .await
            .unwrap();
        assert_eq!(first.len(), 3);
        assert!(dir.path().join(INDEX_FILE).is_file());
        assert!(dir.path().join(METADATA_FILE).is_file());

        // Same row count: the snapshot is reused as-is.
        let reused = PolicyIndex::open_or_build(&catalog(), embedder(), dir.path())
            .await
            .unwrap();
        assert_eq!(reused.len(), 3);

        // Row count changed: rebuild picks up the new policy.
        let grown = catalog().with_policy(policy("privacy", "we keep data for one year"));
        let rebuilt = PolicyIndex::open_or_build(&grown, embedder(), dir.path())
            .await
            .unwrap();
        assert_eq!(rebuilt.len(), 4);
    }

    /// **Scenario**: A truncated snapshot is reported malformed, not panicked on.
    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"SMPI junk").unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), "[]").unwrap();
        let result = PolicyIndex::load(dir.path(), embedder());
        assert!(matches!(result, Err(IndexError::Snapshot(_))));
    }

    /// **Scenario**: Missing snapshot files load as None.
    #[test]
    fn missing_snapshot_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = PolicyIndex::load(dir.path(), embedder()).unwrap();
        assert!(result.is_none());
    }
}
