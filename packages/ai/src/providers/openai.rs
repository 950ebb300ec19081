//! `OpenAI`-compatible chat completions provider.
//!
//! Also covers local servers (Ollama, vLLM, llama.cpp, LM Studio) through a
//! custom base URL.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, LlmResponse, Message, StopReason};
use crate::AiError;

/// Default `OpenAI` model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new provider. `base_url` defaults to the public `OpenAI`
    /// endpoint.
    #[must_use]
    pub fn new(api_key: Option<String>, model: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<LlmResponse, AiError> {
        let mut api_messages = vec![OpenAiMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        }];
        api_messages.extend(messages.iter().map(|m| OpenAiMessage {
            role: m.role.clone(),
            content: m.content.text(),
        }));

        let request = OpenAiRequest {
            model: &self.model,
            messages: api_messages,
            max_tokens: 4096,
        };

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let resp = builder.json(&request).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: OpenAiResponse = serde_json::from_str(&body)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Provider {
                message: "No choices in OpenAI response".to_string(),
            })?;

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            stop_reason,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
