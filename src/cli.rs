//! CLI command implementations.
//!
//! Each `run_*` function performs one `todo` subcommand against an
//! [`AppState`] and prints the result to stdout. Task errors propagate to
//! `main`, which reports them on stderr and exits non-zero.

use anyhow::Result;

use crate::categorize::categorize;
use crate::models::{NewTask, Task, TaskUpdate};
use crate::state::AppState;

fn print_task_row(task: &Task) {
    println!(
        "{:<6} {:<8} {:<14} {}",
        task.id,
        if task.completed { "[x]" } else { "[ ]" },
        task.category,
        task.description
    );
}

fn print_task(task: &Task) {
    println!("id:          {}", task.id);
    println!("description: {}", task.description);
    println!("status:      {}", task.status_label());
    println!("category:    {}", task.category);
}

pub async fn run_add(state: &AppState, description: &str, completed: bool) -> Result<()> {
    let task = state
        .todos
        .create(NewTask {
            description: description.to_string(),
            completed,
        })
        .await?;
    println!("Added task {} ({})", task.id, task.category);
    Ok(())
}

pub async fn run_list(state: &AppState, skip: usize, limit: usize) -> Result<()> {
    let tasks = state.todos.list(skip, limit).await?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!("{:<6} {:<8} {:<14} DESCRIPTION", "ID", "DONE", "CATEGORY");
    for task in &tasks {
        print_task_row(task);
    }
    Ok(())
}

pub async fn run_get(state: &AppState, id: i64) -> Result<()> {
    let task = state.todos.get(id).await?;
    print_task(&task);
    Ok(())
}

pub async fn run_update(state: &AppState, id: i64, update: TaskUpdate) -> Result<()> {
    let task = state.todos.update(id, update).await?;
    println!("Updated task {}", task.id);
    print_task(&task);
    Ok(())
}

/// Set the completion flag, used by both `complete` and `reopen`.
pub async fn run_set_completed(state: &AppState, id: i64, completed: bool) -> Result<()> {
    let update = TaskUpdate {
        completed: Some(completed),
        ..Default::default()
    };
    let task = state.todos.update(id, update).await?;
    println!(
        "Task {} marked {}",
        task.id,
        if completed { "done" } else { "pending" }
    );
    Ok(())
}

pub async fn run_delete(state: &AppState, id: i64) -> Result<()> {
    if !state.todos.delete(id).await? {
        anyhow::bail!("Todo not found");
    }
    println!("Todo deleted successfully");
    Ok(())
}

/// Print the keyword-rule category for `text` without storing anything.
pub fn run_categorize(text: &str) {
    println!("{}", categorize(text));
}

pub async fn run_summary(state: &AppState) -> Result<()> {
    println!("{}", state.assistant.summarize().await);
    Ok(())
}

pub async fn run_chat(state: &AppState, query: &str, selected_text: &str) -> Result<()> {
    println!("{}", state.assistant.chat(query, selected_text).await);
    Ok(())
}
