//! TOML configuration parsing.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working local setup: SQLite under `./data`, keyword categorization, the
//! Hugging Face generator, and a disabled embedding provider.
//!
//! API tokens are never read from the file. Providers take them from the
//! environment when they are constructed (see [`crate::llm::create_generator`]).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub categorizer: CategorizerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/todos.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `huggingface`, `openai`, `anthropic`, `ollama`, or `disabled`.
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    /// Model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// Tried once when a call against `model` fails.
    #[serde(default)]
    pub fallback_model: Option<String>,
    /// Base URL override (Ollama host, OpenAI-compatible gateway, ...).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: None,
            fallback_model: None,
            url: None,
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_provider() -> String {
    "huggingface".to_string()
}
fn default_max_new_tokens() -> u32 {
    150
}
fn default_temperature() -> f32 {
    0.7
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategorizerConfig {
    /// `keyword` or `ai`.
    #[serde(default = "default_categorizer_mode")]
    pub mode: String,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            mode: default_categorizer_mode(),
        }
    }
}

fn default_categorizer_mode() -> String {
    "keyword".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `disabled`, `openai`, `ollama`, or `local`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    /// `memory` or `qdrant`.
    #[serde(default = "default_vector_backend")]
    pub backend: String,
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
        }
    }
}

fn default_vector_backend() -> String {
    "memory".to_string()
}
fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "todos".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Similar tasks appended to a chat prompt.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Upper bound on tasks rendered into a prompt context.
    #[serde(default = "default_max_context_tasks")]
    pub max_context_tasks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_tasks: default_max_context_tasks(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_max_context_tasks() -> usize {
    500
}

impl Config {
    /// Apply environment overrides on top of file values.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `TODO_DB_PATH` | `db.path` |
    /// | `TODO_BIND_ADDR` | `server.bind` |
    /// | `HF_MODEL_NAME` | `generation.model` (Hugging Face only) |
    /// | `QDRANT_URL` | `vector.url` |
    /// | `QDRANT_API_KEY` | `vector.api_key` |
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TODO_DB_PATH") {
            self.db.path = PathBuf::from(path);
        }
        if let Ok(addr) = std::env::var("TODO_BIND_ADDR") {
            self.server.bind = addr;
        }
        if self.generation.provider == "huggingface" {
            if let Ok(model) = std::env::var("HF_MODEL_NAME") {
                self.generation.model = Some(model);
            }
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.vector.url = url;
        }
        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            self.vector.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.generation.provider.as_str() {
            "huggingface" | "openai" | "anthropic" | "ollama" | "disabled" => {}
            other => anyhow::bail!(
                "Unknown generation provider: '{}'. Must be huggingface, openai, anthropic, ollama, or disabled.",
                other
            ),
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
        }

        match self.categorizer.mode.as_str() {
            "keyword" | "ai" => {}
            other => anyhow::bail!(
                "Unknown categorizer mode: '{}'. Must be keyword or ai.",
                other
            ),
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }

        if matches!(self.embedding.provider.as_str(), "openai" | "ollama") {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }

        match self.vector.backend.as_str() {
            "memory" | "qdrant" => {}
            other => anyhow::bail!(
                "Unknown vector backend: '{}'. Must be memory or qdrant.",
                other
            ),
        }

        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }
        if self.retrieval.max_context_tasks == 0 {
            anyhow::bail!("retrieval.max_context_tasks must be >= 1");
        }

        Ok(())
    }
}

/// Parse configuration from TOML text. Does not read the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path` (or defaults when `path` is `None`),
/// apply environment overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert_eq!(cfg.generation.provider, "huggingface");
        assert_eq!(cfg.generation.max_new_tokens, 150);
        assert_eq!(cfg.categorizer.mode, "keyword");
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.vector.collection, "todos");
        assert_eq!(cfg.retrieval.top_k, 3);
    }

    #[test]
    fn test_partial_section() {
        let cfg = parse_config(
            r#"
[generation]
provider = "openai"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        assert_eq!(cfg.generation.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cfg.generation.temperature, 0.7);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse_config("[generation]\nprovider = \"gpt2-local\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown generation provider"));
    }

    #[test]
    fn test_enabled_embedding_requires_dims() {
        let err = parse_config(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_unknown_categorizer_mode_rejected() {
        assert!(parse_config("[categorizer]\nmode = \"magic\"\n").is_err());
    }
}
