//! Google Gemini provider implementation.

use serde::{Deserialize, Serialize};

use super::{ContentBlock, LlmProvider, LlmResponse, Message, MessageContent, StopReason};
use crate::AiError;

/// Default text model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini `generateContent` API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Default)]
pub(crate) struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub content: GeminiContent,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn to_parts(content: &MessageContent) -> Vec<GeminiPart> {
    match content {
        MessageContent::Text(text) => vec![GeminiPart::text(text.clone())],
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => GeminiPart::text(text.clone()),
                ContentBlock::Document { media_type, data } => GeminiPart {
                    text: None,
                    inline_data: Some(GeminiInlineData {
                        mime_type: media_type.clone(),
                        data: data.clone(),
                    }),
                },
            })
            .collect(),
    }
}

pub(crate) fn build_request(system_prompt: &str, messages: &[Message]) -> GeminiRequest {
    GeminiRequest {
        system_instruction: (!system_prompt.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(system_prompt)],
        }),
        contents: messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(if m.role == "assistant" { "model" } else { "user" }.to_string()),
                parts: to_parts(&m.content),
            })
            .collect(),
        generation_config: None,
    }
}

/// Posts `request` to `model:generateContent` and returns the first
/// candidate.
pub(crate) async fn generate(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    request: &GeminiRequest,
) -> Result<GeminiCandidate, AiError> {
    let resp = client
        .post(format!("{API_BASE}/{model}:generateContent"))
        .header("x-goog-api-key", api_key)
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let err: GeminiError = serde_json::from_str(&body).unwrap_or_else(|_| GeminiError {
            error: GeminiErrorDetail {
                message: format!("HTTP {status}: {body}"),
            },
        });
        return Err(AiError::Provider {
            message: err.error.message,
        });
    }

    let response: GeminiResponse = serde_json::from_str(&body)?;
    response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No candidates in Gemini response".to_string(),
        })
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<LlmResponse, AiError> {
        let request = build_request(system_prompt, messages);
        let candidate = generate(&self.client, &self.api_key, &self.model, &request).await?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse { text, stop_reason })
    }

    fn supports_documents(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_roles_and_inline_documents() {
        let messages = [Message::user_blocks(vec![
            ContentBlock::Text {
                text: "Extract the table".to_string(),
            },
            ContentBlock::Document {
                media_type: "application/pdf".to_string(),
                data: "JVBERi0=".to_string(),
            },
        ])];
        let json = serde_json::to_value(build_request("be precise", &messages)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be precise");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let json = serde_json::to_value(build_request("", &[Message::user("hi")])).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }
}
