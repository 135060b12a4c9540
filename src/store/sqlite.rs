//! SQLite-backed [`TaskStore`] implementation.
//!
//! Maps each operation onto the `todos` table created by
//! [`migrate_pool`](crate::migrate::migrate_pool). Every operation is a single
//! statement, so writers queue on SQLite's busy timeout instead of failing on
//! a read-to-write lock upgrade.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Category, Task, TaskUpdate};

use super::TaskStore;

/// SQLite implementation of the [`TaskStore`] trait.
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_task(row: &SqliteRow) -> Result<Task> {
    let category: String = row.get("category");
    Ok(Task {
        id: row.get("id"),
        description: row.get("description"),
        completed: row.get("completed"),
        category: category
            .parse::<Category>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("corrupt category column")?,
    })
}

// SQLite treats a negative LIMIT as "no limit"; clamp instead of wrapping.
fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(
        &self,
        description: &str,
        completed: bool,
        category: Category,
    ) -> Result<Task> {
        let result =
            sqlx::query("INSERT INTO todos (description, completed, category) VALUES (?, ?, ?)")
                .bind(description)
                .bind(completed)
                .bind(category.as_str())
                .execute(&self.pool)
                .await?;

        Ok(Task {
            id: result.last_insert_rowid(),
            description: description.to_string(),
            completed,
            category,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT id, description, completed, category FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT id, description, completed, category FROM todos ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(to_sql_int(limit))
        .bind(to_sql_int(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn update(&self, id: i64, update: &TaskUpdate) -> Result<Option<Task>> {
        // Absent fields bind NULL and keep the stored value.
        let row = sqlx::query(
            "UPDATE todos SET \
                description = COALESCE(?, description), \
                completed = COALESCE(?, completed), \
                category = COALESCE(?, category) \
             WHERE id = ? \
             RETURNING id, description, completed, category",
        )
        .bind(update.description.as_deref())
        .bind(update.completed)
        .bind(update.category.map(|c| c.as_str()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
