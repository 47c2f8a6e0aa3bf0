//! Private AI assistant

mod completion;
#[cfg(feature = "llm")]
mod gemini;
mod session;

#[cfg(test)]
pub use completion::MockCompletion;
pub use completion::{Completion, CompletionError, DisabledCompletion, Turn, TurnRole};
#[cfg(feature = "llm")]
pub use gemini::GeminiClient;
pub use session::{AssistantService, AssistantSession, AssistantSettings, DEFAULT_INSTRUCTIONS};

use std::sync::Arc;

/// Completion backend for the configured key
#[cfg(feature = "llm")]
pub fn backend(api_key: Option<&str>) -> Arc<dyn Completion> {
    match api_key {
        Some(key) => {
            tracing::info!("Assistant enabled with the Gemini backend");
            Arc::new(GeminiClient::new(key))
        }
        None => {
            tracing::info!("No Gemini API key, assistant disabled");
            Arc::new(DisabledCompletion)
        }
    }
}

/// Completion backend for the configured key
#[cfg(not(feature = "llm"))]
pub fn backend(api_key: Option<&str>) -> Arc<dyn Completion> {
    if api_key.is_some() {
        tracing::warn!("Gemini API key ignored: built without the llm feature");
    }
    Arc::new(DisabledCompletion)
}
