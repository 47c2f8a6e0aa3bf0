//! Chat-completion backend seam

use async_trait::async_trait;
use derive_more::Display;
use thiserror::Error;

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TurnRole {
    #[display("You")]
    User,
    #[display("Gemini")]
    Model,
}

/// One message of an assistant conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    /// No backend is configured
    #[error("The assistant is not available.")]
    Disabled,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("The model returned no text")]
    EmptyResponse,
}

/// A chat-completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Completion: Send + Sync {
    /// Generate the model's reply to `prompt` given the earlier `history`
    async fn complete(
        &self,
        model: &str,
        system_instructions: &str,
        history: &[Turn],
        prompt: &str,
    ) -> Result<String, CompletionError>;
}

/// Backend used when no API key is configured or the `llm` feature is off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    async fn complete(
        &self,
        _model: &str,
        _system_instructions: &str,
        _history: &[Turn],
        _prompt: &str,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }
}
