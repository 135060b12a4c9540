//! Qdrant [`VectorStore`] over the REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `reset` | `DELETE /collections/{c}` then `PUT /collections/{c}` (cosine) |
//! | `upsert` | `PUT /collections/{c}/points?wait=true` |
//! | `search` | `POST /collections/{c}/points/search` with payload |
//!
//! Point ids are the task ids. When `api_key` is set it is sent as the
//! `api-key` header.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::VectorConfig;

use super::{ScoredPoint, VectorPoint, VectorStore};

pub struct QdrantStore {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantStore {
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/collections/{}{}", self.url, self.collection, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Qdrant {} request failed", what))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Qdrant {} error {}: {}", what, status, body);
        }
        Ok(response.json().await?)
    }
}

fn point_body(point: VectorPoint) -> Result<Value> {
    let id = u64::try_from(point.id).context("Qdrant point ids must be non-negative")?;
    Ok(json!({
        "id": id,
        "vector": point.vector,
        "payload": {
            "task_id": point.id,
            "content": point.content,
            "completed": point.completed,
        }
    }))
}

fn parse_search_response(json: &Value) -> Result<Vec<ScoredPoint>> {
    let results = json
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing result array"))?;

    results
        .iter()
        .map(|hit| {
            let payload = hit
                .get("payload")
                .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing payload"))?;
            let id = payload
                .get("task_id")
                .and_then(|v| v.as_i64())
                .or_else(|| hit.get("id").and_then(|v| v.as_i64()))
                .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant response: missing id"))?;
            Ok(ScoredPoint {
                id,
                score: hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32,
                content: payload
                    .get("content")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string(),
                completed: payload
                    .get("completed")
                    .and_then(|c| c.as_bool())
                    .unwrap_or(false),
            })
        })
        .collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn reset(&self, dims: usize) -> Result<()> {
        // A missing collection answers 404; either way it is gone afterwards.
        let _ = self
            .authorized(self.client.delete(self.endpoint("")))
            .send()
            .await
            .context("Qdrant delete collection request failed")?;

        let body = json!({ "vectors": { "size": dims, "distance": "Cosine" } });
        self.send(
            self.client.put(self.endpoint("")).json(&body),
            "create collection",
        )
        .await?;
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        let points = points
            .into_iter()
            .map(point_body)
            .collect::<Result<Vec<_>>>()?;
        let body = json!({ "points": points });
        self.send(
            self.client
                .put(self.endpoint("/points?wait=true"))
                .json(&body),
            "upsert",
        )
        .await?;
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        let body = json!({ "vector": query, "limit": k, "with_payload": true });
        let json = self
            .send(
                self.client.post(self.endpoint("/points/search")).json(&body),
                "search",
            )
            .await?;
        parse_search_response(&json)
    }
}
