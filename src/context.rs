//! Prompt context assembly.
//!
//! Renders task records into the flat text blocks handed to the text
//! generator, and shapes the generated summary. Nothing here truncates:
//! callers bound the task set before building a context.

use crate::models::{SimilarTask, Task};

/// Sentinel line used when there are no tasks.
pub const EMPTY_LIST_LINE: &str = "The todo list is currently empty.";

/// Header preceding the task lines.
pub const TASKS_HEADER: &str = "Current tasks in database:";

/// Returned by [`shape_summary`] when the model produced nothing usable.
pub const UP_TO_DATE_SUMMARY: &str = "Your task list is up to date.";

/// Render `tasks` (in the order given) into prompt context.
///
/// ```rust
/// use todo_agent::context::build_context;
/// use todo_agent::models::{Category, Task};
///
/// let tasks = vec![Task {
///     id: 1,
///     description: "Buy milk".into(),
///     completed: false,
///     category: Category::Uncategorized,
/// }];
/// assert_eq!(
///     build_context(&tasks, ""),
///     "Current tasks in database:\n- ID 1: Buy milk [pending]"
/// );
/// ```
pub fn build_context(tasks: &[Task], user_note: &str) -> String {
    let mut lines = Vec::with_capacity(tasks.len() + 2);

    if !user_note.is_empty() {
        lines.push(format!("User context: {}", user_note));
    }

    if tasks.is_empty() {
        lines.push(EMPTY_LIST_LINE.to_string());
    } else {
        lines.push(TASKS_HEADER.to_string());
        for task in tasks {
            lines.push(format!(
                "- ID {}: {} [{}]",
                task.id,
                task.description,
                task.status_label()
            ));
        }
    }

    lines.join("\n")
}

/// Text indexed for a task in the similarity index.
pub fn task_document(task: &Task) -> String {
    let status = if task.completed { "Done" } else { "Pending" };
    format!("Task: {} (Status: {})", task.description, status)
}

pub fn summary_prompt(context: &str) -> String {
    format!(
        "System: Write exactly 2 sentences summarizing the following tasks. \
         Be concise and professional.\n\nTasks:\n{}\n\nSummary:",
        context
    )
}

/// Render similar-task snippets for the chat prompt. Empty when `similar` is.
pub fn similar_section(similar: &[SimilarTask]) -> String {
    if similar.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nSpecifically relevant to your selection:\n");
    for task in similar {
        out.push_str("- ");
        out.push_str(&task.content);
        out.push('\n');
    }
    out
}

pub fn chat_prompt(context: &str, similar: &str, query: &str) -> String {
    format!(
        "System: You are a helpful Todo Assistant. Use the context below to answer.\n\n\
         Context:\n{}\n{}\n\nUser Question: {}\nAssistant:",
        context, similar, query
    )
}

/// Keep at most the first two sentences of a generated summary.
///
/// The reply is split on `.`; blank fragments are dropped. Two or more
/// fragments yield `"{first}.{second}."`, a single fragment yields
/// `"{first}."`, and none yields [`UP_TO_DATE_SUMMARY`].
pub fn shape_summary(generated: &str) -> String {
    let fragments: Vec<&str> = generated
        .trim()
        .split('.')
        .filter(|f| !f.trim().is_empty())
        .collect();

    match fragments.as_slice() {
        [] => UP_TO_DATE_SUMMARY.to_string(),
        [only] => format!("{}.", only),
        [first, second, ..] => format!("{}.{}.", first, second),
    }
}
