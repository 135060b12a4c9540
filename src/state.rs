//! Application wiring.
//!
//! [`AppState`] is built once at startup from [`Config`] and shared by the
//! HTTP handlers and CLI commands. Nothing here is global.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::categorize::create_categorizer;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::index::{create_vector_store, SimilarityIndex};
use crate::llm::create_generator;
use crate::service::Assistant;
use crate::store::{InMemoryTaskStore, SqliteTaskStore, TaskStore, Todos};

#[derive(Clone)]
pub struct AppState {
    pub todos: Todos,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    /// Build the task store, providers, and similarity index.
    ///
    /// With `memory` set, tasks live in process memory and the database
    /// file is never touched. Otherwise the SQLite schema is migrated first.
    pub async fn from_config(config: &Config, memory: bool) -> Result<Self> {
        let store: Arc<dyn TaskStore> = if memory {
            Arc::new(InMemoryTaskStore::new())
        } else {
            let pool = crate::db::connect(config).await?;
            crate::migrate::migrate_pool(&pool)
                .await
                .context("running migrations")?;
            Arc::new(SqliteTaskStore::new(pool))
        };

        let generator = create_generator(&config.generation).with_context(|| {
            format!(
                "building the {} text generator; set [generation] provider = \"disabled\" to run without an API token",
                config.generation.provider
            )
        })?;
        let categorizer = create_categorizer(&config.categorizer, generator.clone());
        let todos = Todos::new(store, categorizer);

        let embedder = create_embedder(&config.embedding)?;
        let vectors = create_vector_store(&config.vector)?;
        let index = Arc::new(SimilarityIndex::new(embedder, vectors));

        let assistant = Assistant::new(
            todos.clone(),
            generator,
            index,
            config.retrieval.top_k,
            config.retrieval.max_context_tasks,
        );

        tracing::info!(
            generation = %config.generation.provider,
            categorizer = %config.categorizer.mode,
            embedding = %config.embedding.provider,
            vector = %config.vector.backend,
            memory,
            "application state ready"
        );

        Ok(Self {
            todos,
            assistant: Arc::new(assistant),
        })
    }
}
