//! OpenAI-compatible chat-completions backend.
//!
//! Summaries are a single user message; image descriptions send a multimodal
//! message with the image inlined as a base64 data URL.

use async_trait::async_trait;
use base64::Engine;
use docmill_core::{BackendError, LanguageModel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

const SUMMARY_PROMPT: &str = "Summarize the following document excerpt in a few concise sentences. \
Keep names, figures and dates that matter.";

const CAPTION_PROMPT: &str = "Describe this image in detail. If it is a chart or diagram, \
explain what it shows; if it is a photo, describe its subject and setting.";

/// Connection settings for a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// API root, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model used for summaries
    pub model: String,
    /// Model used for image descriptions (defaults to `model`)
    pub vision_model: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Completion token cap
    pub max_tokens: u32,
}

impl ChatCompletionsConfig {
    /// Settings for Groq with default timeout and token cap.
    #[must_use]
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            vision_model: None,
            timeout: Duration::from_secs(60),
            max_tokens: 512,
        }
    }

    fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.model)
    }
}

/// Chat-completions client.
pub struct ChatCompletionsBackend {
    client: Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsBackend {
    /// Create a new backend.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, BackendError> {
        debug!("Chat completion with {}", request.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        first_content(parsed)
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsBackend {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn summarize(&self, text: &str) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Text(format!("{SUMMARY_PROMPT}\n\n{text}")),
            }],
            max_tokens: self.config.max_tokens,
            temperature: 0.2,
        };
        self.complete(&request).await
    }

    async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: self.config.vision_model(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: CAPTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(image, mime_type),
                        },
                    },
                ]),
            }],
            max_tokens: self.config.max_tokens,
            temperature: 0.2,
        };
        self.complete(&request).await
    }
}

/// Encode bytes as a `data:<mime>;base64,...` URL.
#[must_use]
pub fn data_url(data: &[u8], mime_type: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{mime_type};base64,{encoded}")
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
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

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn first_content(response: ChatResponse) -> Result<String, BackendError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(BackendError::EmptyResponse)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
