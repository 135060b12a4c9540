//! In-process [`VectorStore`] using brute-force cosine similarity.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;

use super::{ScoredPoint, VectorPoint, VectorStore};

#[derive(Default)]
pub struct MemoryVectorStore {
    points: RwLock<Vec<VectorPoint>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("in-memory vector store lock poisoned")
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn reset(&self, _dims: usize) -> Result<()> {
        self.points.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        let mut stored = self.points.write().map_err(|_| poisoned())?;
        for point in points {
            match stored.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => stored.push(point),
            }
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        let stored = self.points.read().map_err(|_| poisoned())?;
        let mut scored: Vec<ScoredPoint> = stored
            .iter()
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(query, &p.vector),
                content: p.content.clone(),
                completed: p.completed,
            })
            .collect();

        // Stable sort keeps id order among ties.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: i64, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            id,
            vector,
            content: format!("doc {}", id),
            completed: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![point(1, vec![1.0, 0.0])]).await.unwrap();
        store.upsert(vec![point(1, vec![0.0, 1.0])]).await.unwrap();

        let hits = store.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![
                point(1, vec![0.0, 1.0]),
                point(2, vec![1.0, 0.0]),
                point(3, vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_reset_clears() {
        let store = MemoryVectorStore::new();
        store.upsert(vec![point(1, vec![1.0])]).await.unwrap();
        store.reset(1).await.unwrap();
        assert!(store.search(&[1.0], 3).await.unwrap().is_empty());
    }
}
