//! Completion collaborator: prompt in, structured JSON text out.

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::generation::prompt::GenerationRequest;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An external model that turns a generation request into raw JSON text.
///
/// Implementations report unreachable backends as `GenerationUnavailableError`
/// and return `Ok(None)` when the backend answered without content.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<Option<String>>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Provider speaking the OpenAI `chat/completions` protocol.
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| {
                AppError::GenerationUnavailableError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![MessagePayload {
                role: "user",
                content: &request.instructions,
            }],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "tool_specification",
                    "schema": request.response_shape,
                },
            }),
        };

        tracing::debug!(
            model = %self.model,
            schema_version = request.schema_version,
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationUnavailableError(format!(
                "Completion API returned {}: {}",
                status,
                truncate(&text, 300)
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::GenerationUnavailableError(format!(
                "Unreadable completion response: {}",
                e
            ))
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LLM_BASE_URL;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = LlmConfig {
            base_url: format!("{}/", DEFAULT_LLM_BASE_URL),
            model: "gemini-2.0-flash".to_string(),
            api_key: SecretString::from("key".to_string()),
            timeout_secs: 5,
        };
        let provider = OpenAiCompatibleProvider::new(&config).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_chat_response_without_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
