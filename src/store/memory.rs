//! In-memory [`TaskStore`] implementation for tests and `--memory` runs.
//!
//! Rows live in a `BTreeMap` keyed by id behind `std::sync::RwLock`. The id
//! counter only moves forward, so deleted ids are never handed out again.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Category, Task, TaskUpdate};

use super::TaskStore;

struct Inner {
    next_id: i64,
    tasks: BTreeMap<i64, Task>,
}

/// In-memory task store.
pub struct InMemoryTaskStore {
    inner: RwLock<Inner>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                tasks: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("in-memory task store lock poisoned")
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(
        &self,
        description: &str,
        completed: bool,
        category: Category,
    ) -> Result<Task> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let id = inner.next_id;
        inner.next_id += 1;
        let task = Task {
            id,
            description: description.to_string(),
            completed,
            category,
        };
        inner.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: i64) -> Result<Option<Task>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.tasks.get(&id).cloned())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Task>> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner
            .tasks
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, update: &TaskUpdate) -> Result<Option<Task>> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        Ok(inner.tasks.get_mut(&id).map(|task| {
            update.apply_to(task);
            task.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        Ok(inner.tasks.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryTaskStore::new();
        let a = store.insert("a", false, Category::Work).await.unwrap();
        let b = store.insert("b", true, Category::Personal).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(store.get(2).await.unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let store = InMemoryTaskStore::new();
        let a = store.insert("a", false, Category::Work).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(store.get(a.id).await.unwrap().is_none());
    }
}
