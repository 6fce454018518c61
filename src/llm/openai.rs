use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{CompletionService, LlmError};
use crate::config::OpenAiConfig;

/// Longest slice of an error body kept in [`LlmError::Status`].
const SNIPPET_LEN: usize = 300;

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Debug)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url_chat: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
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

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key().ok_or(LlmError::MissingApiKey)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url_chat = format!(
            "{}/v1/chat/completions",
            config.endpoint.trim_end_matches('/')
        );
        info!(model = %config.model, endpoint = %config.endpoint, "completion client initialized");
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            url_chat,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = user_prompt.len()))]
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
        };

        debug!("POST {}", self.url_chat);
        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status,
                snippet: text.chars().take(SNIPPET_LEN).collect(),
            });
        }

        let out: ChatCompletionResponse = resp.json().await?;
        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(LlmError::EmptyChoices)?;

        debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            response_len = content.len(),
            "chat completion completed"
        );
        Ok(content)
    }
}
