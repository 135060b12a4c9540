//! Similarity index over task documents.
//!
//! [`SimilarityIndex`] pairs an [`Embedder`] with a [`VectorStore`]. Each
//! rebuild embeds every task as `Task: {description} (Status: Done|Pending)`
//! and replaces the store contents. Searches never fail: an unbuilt index,
//! a disabled embedder, or an unreachable store all yield an empty result.
//!
//! # Backends
//!
//! | `[vector] backend` | Store |
//! |--------------------|-------|
//! | `"memory"` | [`MemoryVectorStore`] (brute-force cosine) |
//! | `"qdrant"` | [`QdrantStore`] (REST, cosine distance) |

pub mod memory;
pub mod qdrant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::VectorConfig;
use crate::context::task_document;
use crate::embedding::{embed_query, Embedder};
use crate::models::{SimilarTask, Task};

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

/// One indexed task document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: i64,
    pub vector: Vec<f32>,
    pub content: String,
    pub completed: bool,
}

/// A search hit with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: i64,
    pub score: f32,
    pub content: String,
    pub completed: bool,
}

impl From<ScoredPoint> for SimilarTask {
    fn from(p: ScoredPoint) -> Self {
        SimilarTask {
            id: p.id,
            content: p.content,
            completed: p.completed,
        }
    }
}

/// Storage for task vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop all points and prepare for vectors of `dims` dimensions.
    async fn reset(&self, dims: usize) -> Result<()>;

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// At most `k` points by descending similarity to `query`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPoint>>;
}

/// Create the [`VectorStore`] named by `[vector] backend`.
pub fn create_vector_store(config: &VectorConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        "qdrant" => Ok(Arc::new(QdrantStore::new(config)?)),
        other => bail!("Unknown vector backend: {}", other),
    }
}

/// Embedding-backed retrieval of tasks similar to a query.
pub struct SimilarityIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    built: AtomicBool,
}

impl SimilarityIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            built: AtomicBool::new(false),
        }
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Replace the index contents with `tasks`.
    ///
    /// On failure the index is left unbuilt and the error is returned.
    pub async fn index(&self, tasks: &[Task]) -> Result<()> {
        self.built.store(false, Ordering::Release);

        let documents: Vec<String> = tasks.iter().map(task_document).collect();
        let vectors = if documents.is_empty() {
            Vec::new()
        } else {
            self.embedder
                .embed(&documents)
                .await
                .context("embedding task documents")?
        };
        if vectors.len() != documents.len() {
            bail!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            );
        }

        let points = tasks
            .iter()
            .zip(documents)
            .zip(vectors)
            .map(|((task, content), vector)| VectorPoint {
                id: task.id,
                vector,
                content,
                completed: task.completed,
            })
            .collect::<Vec<_>>();

        self.store.reset(self.embedder.dims()).await?;
        if !points.is_empty() {
            self.store.upsert(points).await?;
        }

        self.built.store(true, Ordering::Release);
        tracing::debug!(
            count = tasks.len(),
            model = self.embedder.model_name(),
            "similarity index rebuilt"
        );
        Ok(())
    }

    /// Up to `k` tasks most similar to `query`. Empty when unbuilt or on error.
    pub async fn search(&self, query: &str, k: usize) -> Vec<SimilarTask> {
        if !self.is_built() || k == 0 {
            return Vec::new();
        }
        match self.try_search(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "similarity search failed");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, k: usize) -> Result<Vec<SimilarTask>> {
        let vector = embed_query(self.embedder.as_ref(), query).await?;
        let mut hits = self.store.search(&vector, k).await?;
        hits.truncate(k);
        Ok(hits.into_iter().map(SimilarTask::from).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::DisabledEmbedder;
    use crate::models::Category;

    /// Maps text onto counts of a few marker words, so related tasks land close.
    pub(crate) struct BagOfWords;

    const MARKERS: [&str; 4] = ["milk", "report", "dog", "gym"];

    #[async_trait]
    impl Embedder for BagOfWords {
        fn model_name(&self) -> &str {
            "bag-of-words"
        }
        fn dims(&self) -> usize {
            MARKERS.len()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    MARKERS
                        .iter()
                        .map(|m| lower.matches(m).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    fn task(id: i64, description: &str, completed: bool) -> Task {
        Task {
            id,
            description: description.into(),
            completed,
            category: Category::Uncategorized,
        }
    }

    fn bag_of_words_index() -> SimilarityIndex {
        SimilarityIndex::new(Arc::new(BagOfWords), Arc::new(MemoryVectorStore::new()))
    }

    fn tasks() -> Vec<Task> {
        vec![
            task(1, "Buy milk", false),
            task(2, "Write report", true),
            task(3, "Walk the dog", false),
        ]
    }

    #[tokio::test]
    async fn test_search_before_index_is_empty() {
        let index = bag_of_words_index();
        assert!(index.search("milk", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_closest_first() {
        let index = bag_of_words_index();
        index.index(&tasks()).await.unwrap();

        let hits = index.search("finish the report", 1).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
        assert_eq!(hits[0].content, "Task: Write report (Status: Done)");
        assert!(hits[0].completed);
    }

    #[tokio::test]
    async fn test_search_caps_at_k() {
        let index = bag_of_words_index();
        index.index(&tasks()).await.unwrap();
        assert!(index.search("milk dog report", 2).await.len() <= 2);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_contents() {
        let index = bag_of_words_index();
        index.index(&tasks()).await.unwrap();
        index.index(&[task(7, "Go to the gym", false)]).await.unwrap();

        let hits = index.search("milk dog report gym", 3).await;
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![7]);
    }

    #[tokio::test]
    async fn test_disabled_embedder_leaves_index_unbuilt() {
        let index = SimilarityIndex::new(
            Arc::new(DisabledEmbedder),
            Arc::new(MemoryVectorStore::new()),
        );
        assert!(index.index(&tasks()).await.is_err());
        assert!(!index.is_built());
        assert!(index.search("milk", 3).await.is_empty());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = VectorConfig {
            backend: "faiss".into(),
            ..Default::default()
        };
        assert!(create_vector_store(&config).is_err());
    }
}
