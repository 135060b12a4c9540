//! Task categorization.
//!
//! Two [`Categorizer`] implementations are provided:
//!
//! - **[`KeywordCategorizer`]**: deterministic substring rules (the default).
//! - **[`AiCategorizer`]**: asks the configured [`TextGenerator`] to pick a
//!   label, falling back to the keyword rules when the provider fails.
//!
//! # Keyword rules
//!
//! The lower-cased description is checked against three keyword lists in a
//! fixed order. The first list with any matching substring wins:
//!
//! | Order | Category | Keywords |
//! |-------|----------|----------|
//! | 1 | `Urgent` | urgent, asap, immediately, today, now, critical, important, deadline, crucial |
//! | 2 | `Work` | meeting, work, project, report, email, presentation, client, boss, deadline, task |
//! | 3 | `Personal` | personal, family, friend, shopping, grocery, dinner, lunch, appointment, doctor |
//!
//! Anything else is `Uncategorized`. Matching is unanchored, so `"reporter"`
//! matches `"report"` and `"snow"` matches `"now"`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::CategorizerConfig;
use crate::llm::TextGenerator;
use crate::models::Category;

const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "today",
    "now",
    "critical",
    "important",
    "deadline",
    "crucial",
];

const WORK_KEYWORDS: &[&str] = &[
    "meeting",
    "work",
    "project",
    "report",
    "email",
    "presentation",
    "client",
    "boss",
    "deadline",
    "task",
];

const PERSONAL_KEYWORDS: &[&str] = &[
    "personal",
    "family",
    "friend",
    "shopping",
    "grocery",
    "dinner",
    "lunch",
    "appointment",
    "doctor",
];

const RULES: &[(Category, &[&str])] = &[
    (Category::Urgent, URGENT_KEYWORDS),
    (Category::Work, WORK_KEYWORDS),
    (Category::Personal, PERSONAL_KEYWORDS),
];

/// Apply the keyword rules to a description.
pub fn categorize(description: &str) -> Category {
    let lower = description.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Uncategorized)
}

/// Assigns a category to a new task.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn categorize(&self, description: &str) -> Category;
}

/// The default rule-based categorizer. See [`categorize`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordCategorizer;

#[async_trait]
impl Categorizer for KeywordCategorizer {
    async fn categorize(&self, description: &str) -> Category {
        categorize(description)
    }
}

/// Categorizer that delegates the decision to a text generator.
pub struct AiCategorizer {
    generator: Arc<dyn TextGenerator>,
}

impl AiCategorizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

/// Prompt constraining the model to one of three labels.
pub fn classification_prompt(description: &str) -> String {
    format!(
        "System: Classify the task into exactly one category: Urgent, Work, or Personal. \
         Reply with the category name only.\n\nTask: {}\nCategory:",
        description
    )
}

/// Normalize a classifier reply to a category.
///
/// Only the first word counts. Replies that are not `Urgent`, `Work`, or
/// `Personal` (including `Uncategorized`) become `Personal`.
pub fn parse_classification(reply: &str) -> Category {
    let first = reply
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or("");
    match first.parse::<Category>() {
        Ok(Category::Uncategorized) | Err(_) => Category::Personal,
        Ok(category) => category,
    }
}

#[async_trait]
impl Categorizer for AiCategorizer {
    async fn categorize(&self, description: &str) -> Category {
        match self
            .generator
            .generate(&classification_prompt(description))
            .await
        {
            Ok(reply) => parse_classification(&reply),
            Err(e) => {
                tracing::warn!("AI categorization failed, using keyword rules: {e}");
                categorize(description)
            }
        }
    }
}

/// Build the categorizer selected by `[categorizer] mode`.
pub fn create_categorizer(
    config: &CategorizerConfig,
    generator: Arc<dyn TextGenerator>,
) -> Arc<dyn Categorizer> {
    match config.mode.as_str() {
        "ai" => Arc::new(AiCategorizer::new(generator)),
        _ => Arc::new(KeywordCategorizer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderError;

    #[test]
    fn test_reference_descriptions() {
        assert_eq!(categorize("Buy groceries for dinner"), Category::Personal);
        assert_eq!(categorize("Urgent: finish report"), Category::Urgent);
        assert_eq!(categorize("Walk the dog"), Category::Uncategorized);
    }

    #[test]
    fn test_urgent_beats_work_regardless_of_position() {
        assert_eq!(categorize("Prepare the presentation asap"), Category::Urgent);
        assert_eq!(categorize("Client meeting is critical"), Category::Urgent);
        // "deadline" is in both lists; urgent is checked first.
        assert_eq!(categorize("Project deadline"), Category::Urgent);
    }

    #[test]
    fn test_work_beats_personal() {
        assert_eq!(categorize("Lunch meeting with the boss"), Category::Work);
    }

    #[test]
    fn test_matching_is_case_insensitive_and_unanchored() {
        assert_eq!(categorize("CALL THE DOCTOR"), Category::Personal);
        assert_eq!(categorize("Interview a reporter"), Category::Work);
        assert_eq!(categorize("Shovel snow"), Category::Urgent);
    }

    #[test]
    fn test_parse_classification() {
        assert_eq!(parse_classification("Work"), Category::Work);
        assert_eq!(parse_classification(" urgent.\nBecause..."), Category::Urgent);
        assert_eq!(parse_classification("personal"), Category::Personal);
        assert_eq!(parse_classification("Uncategorized"), Category::Personal);
        assert_eq!(parse_classification("I am not sure"), Category::Personal);
        assert_eq!(parse_classification(""), Category::Personal);
    }

    struct FixedReply(Result<String, ()>);

    #[async_trait]
    impl TextGenerator for FixedReply {
        fn model_name(&self) -> &str {
            "fixed"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.0.clone().map_err(|_| ProviderError::Disabled)
        }
    }

    #[tokio::test]
    async fn test_ai_categorizer_uses_reply() {
        let c = AiCategorizer::new(Arc::new(FixedReply(Ok("Work".into()))));
        assert_eq!(c.categorize("Walk the dog").await, Category::Work);
    }

    #[tokio::test]
    async fn test_ai_categorizer_garbage_reply_is_personal() {
        let c = AiCategorizer::new(Arc::new(FixedReply(Ok("???".into()))));
        assert_eq!(c.categorize("Finish report").await, Category::Personal);
    }

    #[tokio::test]
    async fn test_ai_categorizer_provider_failure_uses_keywords() {
        let c = AiCategorizer::new(Arc::new(FixedReply(Err(()))));
        assert_eq!(c.categorize("Finish report").await, Category::Work);
    }
}
