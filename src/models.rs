//! Core data models used throughout the todo agent.
//!
//! These types represent the task records stored by the [`TaskStore`](crate::store::TaskStore),
//! the request payloads that create and patch them, and the similarity hits
//! returned by the RAG index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topical label assigned to a task.
///
/// Serialized as the capitalized variant name (`"Urgent"`, `"Work"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    Urgent,
    Work,
    Personal,
    #[default]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Urgent,
        Category::Work,
        Category::Personal,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Urgent => "Urgent",
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "invalid category '{}': must be Urgent, Work, Personal, or Uncategorized",
                    wanted
                )
            })
    }
}

/// A stored task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub description: String,
    pub completed: bool,
    pub category: Category,
}

impl Task {
    /// `"completed"` or `"pending"`, as rendered in prompt context.
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "pending"
        }
    }
}

/// Body of `POST /todos`.
///
/// Any `category` field sent by the client is ignored; the categorizer
/// always decides the label of a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
        }
    }
}

/// Partial update: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<Category>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none() && self.category.is_none()
    }

    /// Apply the present fields to `task` in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
    }
}

/// A task returned from a similarity search over the RAG index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarTask {
    pub id: i64,
    pub content: String,
    pub completed: bool,
}
