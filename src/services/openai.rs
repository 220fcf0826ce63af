/// OpenAI chat-completions client
///
/// Sits behind the [`LanguageModel`] trait so the recommendation pipeline can
/// run against a mock in tests.
use crate::error::{AppError, AppResult};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TEMPERATURE: f32 = 0.7;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's reply to `prompt` under the given system message
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<String>;

    /// Model identifier reported alongside generated text
    fn model(&self) -> String;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            tracing::error!(status = %status, error = %message, provider = "openai", "Completion request failed");

            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    AppError::Configuration(format!("OpenAI rejected the API key: {}", message))
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    AppError::RateLimited(format!("OpenAI rate limit: {}", message))
                }
                _ => AppError::ExternalApi(format!(
                    "OpenAI API returned status {}: {}",
                    status, message
                )),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalApi(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::ExternalApi("OpenAI returned no completion".to_string()))?;

        tracing::info!(
            model = %self.model,
            chars = content.len(),
            provider = "openai",
            "Completion generated"
        );

        Ok(content)
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
