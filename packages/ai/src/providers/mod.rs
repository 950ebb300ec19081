//! LLM provider abstraction and implementations.
//!
//! Supports Gemini, Anthropic Claude, and `OpenAI`-compatible servers via a
//! common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Message content.
    pub content: MessageContent,
}

impl Message {
    /// A plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message made of blocks.
    #[must_use]
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// Content of a message: simple text or structured blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Structured content blocks (text plus attached documents).
    Blocks(Vec<ContentBlock>),
}

/// A structured content block within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content.
    Text {
        /// The text.
        text: String,
    },
    /// An attached binary document.
    Document {
        /// MIME type, e.g. `application/pdf`.
        media_type: String,
        /// Base64-encoded payload.
        data: String,
    },
}

impl MessageContent {
    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Document { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Response from the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text.
    pub text: String,
    /// Why generation stopped.
    pub stop_reason: StopReason,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Model finished its response naturally.
    EndTurn,
    /// Maximum tokens reached.
    MaxTokens,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a single-turn completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails.
    async fn chat(&self, system_prompt: &str, messages: &[Message])
    -> Result<LlmResponse, AiError>;

    /// Whether [`ContentBlock::Document`] blocks are understood natively.
    fn supports_documents(&self) -> bool {
        false
    }

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// Provider selection, usually read from the environment or a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// `gemini`, `anthropic`, or `openai`. Auto-detected when unset.
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Base URL for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Reads `AI_PROVIDER`, `AI_MODEL`, and `AI_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            provider: std::env::var("AI_PROVIDER").ok(),
            model: std::env::var("AI_MODEL").ok(),
            base_url: std::env::var("AI_BASE_URL").ok(),
        }
    }
}

/// Reads the Gemini key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
#[must_use]
pub fn gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("GOOGLE_API_KEY"))
        .ok()
}

/// Creates an LLM provider from environment variables.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    create_provider(&ProviderSettings::from_env())
}

/// Creates an LLM provider from explicit settings, taking API keys from the
/// environment.
///
/// If no provider is named, one is auto-detected from available
/// credentials in this order: Gemini, Anthropic, `OpenAI`. An
/// `AI_BASE_URL` without any key selects `OpenAI`-compatible mode, since
/// local servers usually need none.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// requested provider is unknown.
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = settings
        .provider
        .clone()
        .unwrap_or_else(|| detect_provider(settings));

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = gemini_api_key().ok_or_else(|| AiError::Config {
                message: "GEMINI_API_KEY or GOOGLE_API_KEY environment variable not set"
                    .to_string(),
            })?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model)))
        }
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let api_key = std::env::var("OPENAI_API_KEY").ok();
            if api_key.is_none() && settings.base_url.is_none() {
                return Err(AiError::Config {
                    message: "OPENAI_API_KEY environment variable not set".to_string(),
                });
            }
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            Ok(Box::new(openai::OpenAiProvider::new(
                api_key,
                model,
                settings.base_url.clone(),
            )))
        }
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."
            ),
        }),
    }
}

fn detect_provider(settings: &ProviderSettings) -> String {
    if gemini_api_key().is_some() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY/GOOGLE_API_KEY found)");
        return "gemini".to_string();
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() || settings.base_url.is_some() {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return "openai".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: GEMINI_API_KEY, GOOGLE_API_KEY, \
         ANTHROPIC_API_KEY, OPENAI_API_KEY, or AI_BASE_URL. You can also set \
         AI_PROVIDER explicitly."
    );

    // Produces a clear error about the missing key.
    "gemini".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_text_skips_documents() {
        let content = MessageContent::Blocks(vec![
            ContentBlock::Text {
                text: "first".to_string(),
            },
            ContentBlock::Document {
                media_type: "application/pdf".to_string(),
                data: "AAAA".to_string(),
            },
            ContentBlock::Text {
                text: "second".to_string(),
            },
        ]);
        assert_eq!(content.text(), "first\nsecond");
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let settings = ProviderSettings {
            provider: Some("bard".to_string()),
            ..ProviderSettings::default()
        };
        assert!(matches!(
            create_provider(&settings),
            Err(AiError::Config { .. })
        ));
    }

    #[test]
    fn openai_compatible_base_url_needs_no_key() {
        let settings = ProviderSettings {
            provider: Some("openai".to_string()),
            model: Some("llama3".to_string()),
            base_url: Some("http://localhost:11434/v1".to_string()),
        };
        let provider = create_provider(&settings).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(!provider.supports_documents());
    }
}
