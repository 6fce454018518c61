//! Completion service abstraction.
//!
//! The reviewer only needs one blocking-style operation: send a system and a
//! user prompt, get text back. Retrying is the caller's job (see
//! [`crate::retry`]).

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {snippet}")]
    Status {
        status: reqwest::StatusCode,
        snippet: String,
    },

    #[error("completion response contained no message content")]
    EmptyChoices,

    #[error("OpenAI API key not found in config or environment")]
    MissingApiKey,
}

/// A text-completion backend with a fixed model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;
}
