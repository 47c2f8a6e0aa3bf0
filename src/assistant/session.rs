//! Per-user assistant conversations

use crate::action::{Button, Keyboard};
use crate::assistant::completion::{Completion, CompletionError, Turn};
use crate::callback::CallbackPayload;
use crate::error::{EngineError, EngineResult};
use crate::types::UserId;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Turns shown by the history command
const HISTORY_TURNS_SHOWN: usize = 10;

/// Assistant settings shared by every user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    /// Selectable models; the first one is the default
    pub allowed_models: Vec<String>,
    pub default_instructions: String,
    /// Longest history text the history command returns
    pub history_char_limit: usize,
    /// Turns kept per user and sent with each prompt; older ones are dropped
    pub max_history_turns: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            allowed_models: vec!["gemini-2.5-flash".to_string(), "gemini-2.5-pro".to_string()],
            default_instructions: DEFAULT_INSTRUCTIONS.to_string(),
            history_char_limit: 4000,
            max_history_turns: 40,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssistantSession {
    pub history: Vec<Turn>,
    /// `None` means the default instructions
    pub instructions: Option<String>,
    /// `None` means the default model
    pub model: Option<String>,
    /// When set, conversations are not remembered
    pub incognito: bool,
}

/// Conversations with the completion backend, one per user
#[derive(Clone)]
pub struct AssistantService {
    sessions: Arc<DashMap<UserId, AssistantSession>>,
    completion: Arc<dyn Completion>,
    settings: AssistantSettings,
}

impl AssistantService {
    pub fn new(completion: Arc<dyn Completion>, settings: AssistantSettings) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            completion,
            settings,
        }
    }

    #[must_use]
    pub fn session(&self, user: UserId) -> AssistantSession {
        self.sessions
            .get(&user)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    fn default_model(&self) -> &str {
        self.settings
            .allowed_models
            .first()
            .map_or("gemini-2.5-flash", String::as_str)
    }

    /// Forget the conversation; settings are kept
    pub fn new_chat(&self, user: UserId) {
        if let Some(mut session) = self.sessions.get_mut(&user) {
            session.history.clear();
        }
        debug!(user_id = %user, "Assistant history cleared");
    }

    /// Flip incognito mode and return the new state
    pub fn toggle_incognito(&self, user: UserId) -> bool {
        let mut session = self.sessions.entry(user).or_default();
        session.incognito = !session.incognito;
        session.incognito
    }

    /// The most recent turns as text, `None` when there is no history.
    ///
    /// Longer text is cut from the front to the configured limit.
    #[must_use]
    pub fn history_text(&self, user: UserId) -> Option<String> {
        let session = self.sessions.get(&user)?;
        if session.history.is_empty() {
            return None;
        }

        let start = session.history.len().saturating_sub(HISTORY_TURNS_SHOWN);
        let text = session.history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        Some(tail_chars(&text, self.settings.history_char_limit).to_string())
    }

    /// # Errors
    /// `InvalidModel` when `model` is not in the allow-list
    pub fn switch_model(&self, user: UserId, model: &str) -> EngineResult<()> {
        if !self.settings.allowed_models.iter().any(|m| m == model) {
            return Err(EngineError::InvalidModel(model.to_string()));
        }
        self.sessions.entry(user).or_default().model = Some(model.to_string());
        info!(user_id = %user, model, "Assistant model switched");
        Ok(())
    }

    /// One button per allowed model
    #[must_use]
    pub fn model_keyboard(&self) -> Keyboard {
        Keyboard::column(
            self.settings
                .allowed_models
                .iter()
                .map(|model| Button::new(model.clone(), CallbackPayload::Model(model.clone())))
                .collect(),
        )
    }

    pub fn set_instructions(&self, user: UserId, instructions: &str) {
        self.sessions.entry(user).or_default().instructions = Some(instructions.to_string());
    }

    /// Send `prompt` to the backend and return the reply.
    ///
    /// Both turns are remembered only when the call succeeds and incognito
    /// mode is off.
    ///
    /// # Errors
    /// Whatever the backend reports
    pub async fn chat(&self, user: UserId, prompt: &str) -> Result<String, CompletionError> {
        // Snapshot so no map lock is held across the request
        let session = self.session(user);
        let model = session
            .model
            .clone()
            .unwrap_or_else(|| self.default_model().to_string());
        let instructions = session
            .instructions
            .as_deref()
            .unwrap_or(&self.settings.default_instructions);
        let history: &[Turn] = if session.incognito {
            &[]
        } else {
            &session.history
        };

        let reply = self
            .completion
            .complete(&model, instructions, history, prompt)
            .await
            .inspect_err(|e| warn!(user_id = %user, model = %model, error = %e, "Completion failed"))?;

        if !session.incognito {
            let mut entry = self.sessions.entry(user).or_default();
            entry.history.push(Turn::user(prompt));
            entry.history.push(Turn::model(reply.clone()));
            let excess = entry
                .history
                .len()
                .saturating_sub(self.settings.max_history_turns);
            entry.history.drain(..excess);
        }
        Ok(reply)
    }
}

/// The last `limit` characters of `text`
fn tail_chars(text: &str, limit: usize) -> &str {
    let count = text.chars().count();
    if count <= limit {
        return text;
    }
    text.char_indices()
        .nth(count - limit)
        .map_or("", |(index, _)| &text[index..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::completion::MockCompletion;

    const USER: UserId = UserId(5);

    fn echo_backend() -> MockCompletion {
        let mut completion = MockCompletion::new();
        completion
            .expect_complete()
            .returning(|_, _, history, prompt| Ok(format!("{}:{prompt}", history.len())));
        completion
    }

    fn service(completion: MockCompletion) -> AssistantService {
        AssistantService::new(Arc::new(completion), AssistantSettings::default())
    }

    #[tokio::test]
    async fn test_chat_remembers_turns() {
        let service = service(echo_backend());
        assert_eq!(service.chat(USER, "hi").await.unwrap(), "0:hi");
        assert_eq!(service.chat(USER, "again").await.unwrap(), "2:again");
        assert_eq!(service.session(USER).history.len(), 4);

        service.new_chat(USER);
        assert!(service.session(USER).history.is_empty());
        assert_eq!(service.history_text(USER), None);
    }

    #[tokio::test]
    async fn test_incognito_skips_history() {
        let service = service(echo_backend());
        service.chat(USER, "remember me").await.unwrap();

        assert!(service.toggle_incognito(USER));
        assert_eq!(service.chat(USER, "secret").await.unwrap(), "0:secret");
        assert_eq!(service.session(USER).history.len(), 2);

        assert!(!service.toggle_incognito(USER));
    }

    #[tokio::test]
    async fn test_failed_chat_leaves_history() {
        let mut completion = MockCompletion::new();
        completion.expect_complete().returning(|_, _, _, _| {
            Err(CompletionError::Api {
                status: 429,
                message: "quota".into(),
            })
        });
        let service = service(completion);

        assert!(service.chat(USER, "hi").await.is_err());
        assert!(service.session(USER).history.is_empty());
    }

    #[tokio::test]
    async fn test_defaults_and_overrides_reach_backend() {
        let mut completion = MockCompletion::new();
        completion
            .expect_complete()
            .withf(|model, instructions, _, _| {
                model == "gemini-2.5-flash" && instructions == DEFAULT_INSTRUCTIONS
            })
            .times(1)
            .returning(|_, _, _, _| Ok("ok".into()));
        completion
            .expect_complete()
            .withf(|model, instructions, _, _| model == "gemini-2.5-pro" && instructions == "Be terse.")
            .times(1)
            .returning(|_, _, _, _| Ok("ok".into()));
        let service = service(completion);

        service.chat(USER, "first").await.unwrap();
        service.switch_model(USER, "gemini-2.5-pro").unwrap();
        service.set_instructions(USER, "Be terse.");
        service.chat(USER, "second").await.unwrap();
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let settings = AssistantSettings {
            max_history_turns: 4,
            ..AssistantSettings::default()
        };
        let service = AssistantService::new(Arc::new(echo_backend()), settings);

        for i in 0..5 {
            service.chat(USER, &format!("q{i}")).await.unwrap();
        }
        // Each prompt goes out with at most the capped history
        assert_eq!(service.chat(USER, "last").await.unwrap(), "4:last");

        let history = service.session(USER).history;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].text, "q4");
    }

    #[test]
    fn test_switch_model_rejects_unknown() {
        let service = service(MockCompletion::new());
        assert!(matches!(
            service.switch_model(USER, "gpt-4"),
            Err(EngineError::InvalidModel(m)) if m == "gpt-4"
        ));
        assert_eq!(service.session(USER).model, None);
        assert_eq!(service.model_keyboard().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_history_text_shows_recent_turns() {
        let service = service(echo_backend());
        for i in 0..6 {
            service.chat(USER, &format!("q{i}")).await.unwrap();
        }

        let text = service.history_text(USER).unwrap();
        assert_eq!(text.matches("You: ").count(), 5);
        assert!(text.starts_with("You: q1"));
        assert!(text.ends_with("Gemini: 10:q5"));
    }

    #[test]
    fn test_tail_chars_respects_char_boundaries() {
        assert_eq!(tail_chars("héllo", 10), "héllo");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("héllo", 0), "");
    }
}
