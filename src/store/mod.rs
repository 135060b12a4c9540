//! Task storage.
//!
//! The [`TaskStore`] trait is the raw row contract implemented by each
//! backend ([`SqliteTaskStore`], [`InMemoryTaskStore`]). [`Todos`] wraps a
//! backend with the task lifecycle rules: description validation,
//! categorization at creation, page-size bounds, and precise errors.
//!
//! | Method | Errors |
//! |--------|--------|
//! | [`Todos::create`] | `Validation` |
//! | [`Todos::get`] | `NotFound` |
//! | [`Todos::list`] | none |
//! | [`Todos::update`] | `NotFound`, `Validation` |
//! | [`Todos::delete`] | none (returns `false` for a missing id) |
//!
//! Every method may also fail with `Storage` when the backend does.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::categorize::Categorizer;
use crate::models::{Category, NewTask, Task, TaskUpdate};

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// Largest page returned by [`Todos::list`].
pub const MAX_PAGE_SIZE: usize = 100;

/// Backend row operations. Implementations assign ids and keep insertion
/// order; they do not validate.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new row, assigning the next id.
    async fn insert(&self, description: &str, completed: bool, category: Category)
        -> Result<Task>;

    async fn get(&self, id: i64) -> Result<Option<Task>>;

    /// Rows in id order, skipping `offset`, at most `limit`.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Task>>;

    /// Write the present fields of `update`. `None` if the id is absent.
    async fn update(&self, id: i64, update: &TaskUpdate) -> Result<Option<Task>>;

    /// Hard delete. `true` if a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Errors from the task lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),
    #[error("Todo not found")]
    NotFound(i64),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Validated task operations over a [`TaskStore`].
#[derive(Clone)]
pub struct Todos {
    store: Arc<dyn TaskStore>,
    categorizer: Arc<dyn Categorizer>,
}

fn validated_description(description: &str) -> Result<&str, TaskError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(TaskError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

impl Todos {
    pub fn new(store: Arc<dyn TaskStore>, categorizer: Arc<dyn Categorizer>) -> Self {
        Self { store, categorizer }
    }

    pub async fn create(&self, new: NewTask) -> Result<Task, TaskError> {
        let description = validated_description(&new.description)?;
        let category = self.categorizer.categorize(description).await;
        let task = self
            .store
            .insert(description, new.completed, category)
            .await?;
        tracing::info!(id = task.id, category = %task.category, "created task");
        Ok(task)
    }

    pub async fn get(&self, id: i64) -> Result<Task, TaskError> {
        self.store.get(id).await?.ok_or(TaskError::NotFound(id))
    }

    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list(offset, limit.min(MAX_PAGE_SIZE)).await?)
    }

    /// The first `max` tasks, for prompt context.
    pub async fn all(&self, max: usize) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list(0, max).await?)
    }

    pub async fn update(&self, id: i64, mut update: TaskUpdate) -> Result<Task, TaskError> {
        if let Some(ref description) = update.description {
            update.description = Some(validated_description(description)?.to_string());
        }
        if update.is_empty() {
            return self.get(id).await;
        }
        self.store
            .update(id, &update)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, TaskError> {
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::info!(id, "deleted task");
        }
        Ok(removed)
    }
}
