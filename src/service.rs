//! Summary and chat over the task list.
//!
//! [`Assistant`] builds prompt context from the stored tasks, optionally
//! enriches chat prompts with similar tasks from the [`SimilarityIndex`],
//! and forwards the prompt to the configured [`TextGenerator`].
//!
//! Neither operation returns an error. Store and generator failures are
//! logged and replaced with a fixed placeholder reply; index failures only
//! drop the similar-task section.

use anyhow::Result;
use std::sync::Arc;

use crate::context::{build_context, chat_prompt, shape_summary, similar_section, summary_prompt};
use crate::index::SimilarityIndex;
use crate::llm::TextGenerator;
use crate::store::Todos;

/// Reply to a summary request when generation fails.
pub const SUMMARY_PLACEHOLDER: &str = "AI is thinking... Please try again later.";

/// Reply to a chat request when generation fails.
pub const CHAT_PLACEHOLDER: &str = "AI is thinking... please try again later.";

pub struct Assistant {
    todos: Todos,
    generator: Arc<dyn TextGenerator>,
    index: Arc<SimilarityIndex>,
    top_k: usize,
    max_context_tasks: usize,
}

impl Assistant {
    pub fn new(
        todos: Todos,
        generator: Arc<dyn TextGenerator>,
        index: Arc<SimilarityIndex>,
        top_k: usize,
        max_context_tasks: usize,
    ) -> Self {
        Self {
            todos,
            generator,
            index,
            top_k,
            max_context_tasks,
        }
    }

    /// A short summary of the whole task list.
    pub async fn summarize(&self) -> String {
        match self.try_summarize().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed");
                SUMMARY_PLACEHOLDER.to_string()
            }
        }
    }

    /// Answer `query` with the task list as context. A non-blank
    /// `selected_text` adds the tasks most similar to it.
    pub async fn chat(&self, query: &str, selected_text: &str) -> String {
        match self.try_chat(query, selected_text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "chat generation failed");
                CHAT_PLACEHOLDER.to_string()
            }
        }
    }

    async fn try_summarize(&self) -> Result<String> {
        let tasks = self.todos.all(self.max_context_tasks).await?;
        let prompt = summary_prompt(&build_context(&tasks, ""));
        let reply = self.generator.generate(&prompt).await?;
        Ok(shape_summary(&reply))
    }

    async fn try_chat(&self, query: &str, selected_text: &str) -> Result<String> {
        let tasks = self.todos.all(self.max_context_tasks).await?;
        let context = build_context(&tasks, "");

        let similar = if selected_text.trim().is_empty() {
            String::new()
        } else {
            if let Err(e) = self.index.index(&tasks).await {
                tracing::warn!(error = %e, "similarity index rebuild failed");
            }
            similar_section(&self.index.search(selected_text, self.top_k).await)
        };

        let prompt = chat_prompt(&context, &similar, query);
        tracing::debug!(
            model = self.generator.model_name(),
            chars = prompt.len(),
            "sending chat prompt"
        );
        Ok(self.generator.generate(&prompt).await?)
    }
}
