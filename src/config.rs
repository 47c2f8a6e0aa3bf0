//! Bot configuration
//!
//! Loaded once at startup from an optional YAML file. Every field has a
//! default, and secrets can come from the environment instead of the file.

use crate::assistant::AssistantSettings;
use crate::moderation::ModerationPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "config/chat_warden.yaml";
/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CHAT_WARDEN_CONFIG";
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// What a non-admin sees when running a moderation command in a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenialMode {
    /// Reply with a short denial
    #[default]
    Explicit,
    /// Ignore the command
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub warning_threshold: usize,
    pub auto_ban_hours: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 3,
            auto_ban_hours: 24,
        }
    }
}

impl ModerationConfig {
    #[must_use]
    pub fn policy(&self) -> ModerationPolicy {
        ModerationPolicy {
            warning_threshold: self.warning_threshold,
            auto_ban: Duration::from_secs(self.auto_ban_hours.saturating_mul(60 * 60)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub denial: DenialMode,
    /// Moderation commands and member messages only work in groups that ran
    /// the authorization command
    pub require_authorization: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    /// Idle time after which a game is dropped
    pub ttl_secs: u64,
    /// How often the maintenance task runs
    pub sweep_interval_secs: u64,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub allowed_models: Vec<String>,
    pub default_instructions: String,
    pub history_char_limit: usize,
    pub max_history_turns: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let settings = AssistantSettings::default();
        Self {
            allowed_models: settings.allowed_models,
            default_instructions: settings.default_instructions,
            history_char_limit: settings.history_char_limit,
            max_history_turns: settings.max_history_turns,
        }
    }
}

impl AssistantConfig {
    #[must_use]
    pub fn settings(&self) -> AssistantSettings {
        AssistantSettings {
            allowed_models: self.allowed_models.clone(),
            default_instructions: self.default_instructions.clone(),
            history_char_limit: self.history_char_limit,
            max_history_turns: self.max_history_turns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Usually supplied through `DISCORD_TOKEN`
    pub discord_token: Option<String>,
    /// Usually supplied through `GEMINI_API_KEY`. Without it the assistant is off.
    pub gemini_api_key: Option<String>,
    pub command_prefix: String,
    pub log_dir: String,
    pub moderation: ModerationConfig,
    pub dispatch: DispatchConfig,
    pub games: GamesConfig,
    pub assistant: AssistantConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            discord_token: None,
            gemini_api_key: None,
            command_prefix: "!".to_string(),
            log_dir: "logs".to_string(),
            moderation: ModerationConfig::default(),
            dispatch: DispatchConfig::default(),
            games: GamesConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl BotConfig {
    /// # Errors
    /// Returns an error if the YAML is malformed
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `CHAT_WARDEN_CONFIG` or the default path, then apply
    /// environment overrides. A missing default file is not an error.
    ///
    /// # Errors
    /// Returns an error if an explicitly named file cannot be read, or the
    /// file cannot be parsed, or the result fails validation.
    pub async fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                info!(path = %path, "Loaded configuration file");
                Self::from_yaml_str(&content)?
            }
            Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path, "No configuration file, using defaults");
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Fill secrets from the environment. Non-empty variables win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|value: &String| !value.trim().is_empty());
        if let Some(token) = present(DISCORD_TOKEN_ENV) {
            self.discord_token = Some(token);
        }
        if let Some(key) = present(GEMINI_API_KEY_ENV) {
            self.gemini_api_key = Some(key);
        }
    }

    /// # Errors
    /// Returns the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.moderation.warning_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "moderation.warning_threshold",
                reason: "must be at least 1",
            });
        }
        if self.games.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "games.sweep_interval_secs",
                reason: "must be at least 1",
            });
        }
        if self.assistant.allowed_models.is_empty() {
            return Err(ConfigError::Invalid {
                field: "assistant.allowed_models",
                reason: "must list at least one model",
            });
        }
        if self.command_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "command_prefix",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// # Errors
    /// `Missing` when no token was configured
    pub fn discord_token(&self) -> Result<&str, ConfigError> {
        self.discord_token
            .as_deref()
            .ok_or(ConfigError::Missing(DISCORD_TOKEN_ENV))
    }

    #[must_use]
    pub fn game_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.games.ttl_secs).unwrap_or(i64::MAX))
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.games.sweep_interval_secs)
    }
}
