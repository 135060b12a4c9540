//! Text generation provider abstraction and implementations.
//!
//! Defines the [`TextGenerator`] trait and concrete implementations:
//! - **[`DisabledGenerator`]**: always fails; used when generation is not configured.
//! - **[`HuggingFaceGenerator`]**: Hugging Face Inference API text generation.
//! - **[`OpenAIGenerator`]**: OpenAI chat completions.
//! - **[`AnthropicGenerator`]**: Anthropic messages API.
//! - **[`OllamaGenerator`]**: a local Ollama instance's `/api/generate` endpoint.
//!
//! [`FallbackGenerator`] wraps any two of these and tries the second once
//! when the first fails.
//!
//! # Provider Selection
//!
//! Use [`create_generator`] to instantiate the provider named by
//! `[generation] provider`:
//!
//! | Config Value | Provider | Token variable | Default model |
//! |-------------|----------|----------------|---------------|
//! | `"huggingface"` | [`HuggingFaceGenerator`] | `HUGGINGFACEHUB_API_TOKEN` | `gpt2` (fallback `distilgpt2`) |
//! | `"openai"` | [`OpenAIGenerator`] | `OPENAI_API_KEY` | `gpt-3.5-turbo` |
//! | `"anthropic"` | [`AnthropicGenerator`] | `ANTHROPIC_API_KEY` | `claude-3-haiku-20240307` |
//! | `"ollama"` | [`OllamaGenerator`] | - | `llama3.2` |
//! | `"disabled"` | [`DisabledGenerator`] | - | - |
//!
//! A missing token is reported by `create_generator`, at startup, rather
//! than on the first request.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;

/// Returned in place of a blank completion.
pub const NO_RESPONSE: &str = "AI could not generate a response.";

/// Stop sequences sent to Hugging Face text generation.
const STOP_SEQUENCES: &[&str] = &["\nUser:", "\nAssistant:", "\nSystem:", "</s>"];

/// Failure at the text generation boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("generation provider is disabled")]
    Disabled,
    #[error("{0} environment variable not set")]
    MissingToken(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

/// A hosted or local model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt2"`).
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

fn token_from_env(var: &'static str) -> Result<String, ProviderError> {
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ProviderError::MissingToken(var)),
    }
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Send a prepared request and decode a JSON body, mapping non-2xx to
/// [`ProviderError::Api`].
async fn send_json(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn invalid(provider: &'static str, message: impl Into<String>) -> ProviderError {
    ProviderError::InvalidResponse {
        provider,
        message: message.into(),
    }
}

fn non_blank(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text.to_string()
    }
}

// ============ Disabled Generator ============

/// A generator that always returns [`ProviderError::Disabled`].
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled)
    }
}

// ============ Hugging Face Generator ============

/// Hugging Face serverless inference, served through the Inference Providers
/// router. Override with `generation.url` for a dedicated endpoint.
pub const DEFAULT_HUGGINGFACE_URL: &str = "https://router.huggingface.co/hf-inference";

/// Text generation through the Hugging Face Inference API.
///
/// Calls `POST {base}/models/{model}` with sampling enabled and the
/// `\nUser:` / `\nAssistant:` / `\nSystem:` / `</s>` stop sequences.
/// Models that echo the prompt have it stripped from the reply.
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    token: String,
    base_url: String,
    model: String,
    max_new_tokens: u32,
    temperature: f32,
}

impl HuggingFaceGenerator {
    pub fn new(config: &GenerationConfig, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config)?,
            token: token_from_env("HUGGINGFACEHUB_API_TOKEN")?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_URL.to_string()),
            model,
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }
}

fn huggingface_model_url(base_url: &str, model: &str) -> String {
    format!("{}/models/{}", base_url.trim_end_matches('/'), model)
}

/// Extract the generated text from a Hugging Face response, which is either
/// `[{"generated_text": ...}]` or a bare object.
fn parse_huggingface_response(json: &Value, prompt: &str) -> Result<String, ProviderError> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(invalid("Hugging Face", err));
    }

    let item = match json.as_array() {
        Some(items) => items
            .first()
            .ok_or_else(|| invalid("Hugging Face", "empty result array"))?,
        None => json,
    };

    let text = item
        .get("generated_text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| invalid("Hugging Face", "missing generated_text"))?;

    Ok(non_blank(text.strip_prefix(prompt).unwrap_or(text)))
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": self.temperature,
                "do_sample": true,
                "stop": STOP_SEQUENCES,
                "return_full_text": false,
            },
        });

        let request = self
            .client
            .post(huggingface_model_url(&self.base_url, &self.model))
            .bearer_auth(&self.token)
            .json(&body);

        let json = send_json("Hugging Face", request).await?;
        parse_huggingface_response(&json, prompt)
    }
}

// ============ OpenAI Generator ============

/// Chat completions through the OpenAI API (or any compatible gateway set
/// with `generation.url`).
pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config)?,
            api_key: token_from_env("OPENAI_API_KEY")?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            model,
            max_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }
}

fn parse_openai_response(json: &Value) -> Result<String, ProviderError> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| invalid("OpenAI", "missing choices[0].message.content"))?;
    Ok(non_blank(content))
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        let json = send_json("OpenAI", request).await?;
        parse_openai_response(&json)
    }
}

// ============ Anthropic Generator ============

/// Messages API for Anthropic models.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicGenerator {
    pub fn new(config: &GenerationConfig, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config)?,
            api_key: token_from_env("ANTHROPIC_API_KEY")?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            model,
            max_tokens: config.max_new_tokens,
            // Anthropic accepts [0, 1].
            temperature: config.temperature.min(1.0),
        })
    }
}

fn parse_anthropic_response(json: &Value) -> Result<String, ProviderError> {
    let blocks = json
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| invalid("Anthropic", "missing content array"))?;

    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();

    Ok(non_blank(&text))
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body);

        let json = send_json("Anthropic", request).await?;
        parse_anthropic_response(&json)
    }
}

// ============ Ollama Generator ============

/// Local generation through Ollama (default `http://localhost:11434`).
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig, model: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
            max_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }
}

fn parse_ollama_response(json: &Value) -> Result<String, ProviderError> {
    let text = json
        .get("response")
        .and_then(|r| r.as_str())
        .ok_or_else(|| invalid("Ollama", "missing response field"))?;
    Ok(non_blank(text))
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });

        let request = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body);

        let json = send_json("Ollama", request).await?;
        parse_ollama_response(&json)
    }
}

// ============ Fallback ============

/// Tries `primary`, then `fallback` exactly once if `primary` fails.
pub struct FallbackGenerator {
    primary: Box<dyn TextGenerator>,
    fallback: Box<dyn TextGenerator>,
}

impl FallbackGenerator {
    pub fn new(primary: Box<dyn TextGenerator>, fallback: Box<dyn TextGenerator>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    fn model_name(&self) -> &str {
        self.primary.model_name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        match self.primary.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(
                    "Generation with {} failed ({e}); trying fallback model {}",
                    self.primary.model_name(),
                    self.fallback.model_name()
                );
                self.fallback.generate(prompt).await
            }
        }
    }
}

fn build_provider(
    config: &GenerationConfig,
    model: String,
) -> Result<Box<dyn TextGenerator>, ProviderError> {
    Ok(match config.provider.as_str() {
        "huggingface" => Box::new(HuggingFaceGenerator::new(config, model)?),
        "openai" => Box::new(OpenAIGenerator::new(config, model)?),
        "anthropic" => Box::new(AnthropicGenerator::new(config, model)?),
        "ollama" => Box::new(OllamaGenerator::new(config, model)?),
        _ => Box::new(DisabledGenerator),
    })
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "huggingface" => "gpt2",
        "openai" => "gpt-3.5-turbo",
        "anthropic" => "claude-3-haiku-20240307",
        "ollama" => "llama3.2",
        _ => "disabled",
    }
}

fn default_fallback_model(provider: &str) -> Option<&'static str> {
    match provider {
        "huggingface" => Some("distilgpt2"),
        _ => None,
    }
}

/// Create the [`TextGenerator`] named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown provider names or when the provider's API
/// token is not in the environment.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => return Ok(Arc::new(DisabledGenerator)),
        "huggingface" | "openai" | "anthropic" | "ollama" => {}
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }

    let provider = config.provider.as_str();
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| default_model(provider).to_string());
    let fallback = config
        .fallback_model
        .clone()
        .or_else(|| default_fallback_model(provider).map(str::to_string))
        .filter(|f| *f != model);

    let primary = build_provider(config, model)?;
    let generator: Arc<dyn TextGenerator> = match fallback {
        Some(fallback_model) => Arc::new(FallbackGenerator::new(
            primary,
            build_provider(config, fallback_model)?,
        )),
        None => Arc::from(primary),
    };
    Ok(generator)
}
