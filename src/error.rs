//! Error types for the moderation and game engines
//!
//! Every variant renders as a single user-facing line. The dispatcher relies on
//! that to report failures without further formatting.

use crate::callback::CallbackError;
use crate::duration::DurationError;
use crate::messenger::MessengerError;
use thiserror::Error;

/// Errors that can occur while handling a command or callback
#[derive(Debug, Error)]
pub enum EngineError {
    /// Duration text could not be parsed
    #[error(transparent)]
    InvalidDuration(#[from] DurationError),

    /// Auto-mode outside strict / normal / fun
    #[error("Invalid mode '{0}'. Choose: strict, normal, fun")]
    InvalidMode(String),

    /// Model outside the configured allow-list
    #[error("Invalid model '{0}'.")]
    InvalidModel(String),

    /// The subject is the group's creator
    #[error("This user is the owner, I cannot {action} this user!")]
    CannotSanctionOwner { action: &'static str },

    /// Opponent reference did not resolve to a user
    #[error("User not found.")]
    OpponentNotFound,

    /// Subject reference did not resolve to a user
    #[error("{0}")]
    UnresolvedTarget(String),

    /// Game finished, expired or never existed
    #[error("This game has ended or expired.")]
    GameNotFound,

    /// Actor is not the seat to move
    #[error("Not your turn!")]
    NotYourTurn,

    /// Target cell already holds a mark
    #[error("Already taken!")]
    CellOccupied,

    /// Actor lacks the admin role
    #[error("You must be an admin to use this command.")]
    NotAuthorized,

    /// Button payload could not be decoded
    #[error(transparent)]
    InvalidCallback(#[from] CallbackError),

    /// The messaging platform rejected or failed a request
    #[error("{0}")]
    ExternalCallFailed(String),
}

impl From<MessengerError> for EngineError {
    fn from(error: MessengerError) -> Self {
        Self::ExternalCallFailed(error.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::InvalidMode("weird".to_string());
        assert_eq!(error.to_string(), "Invalid mode 'weird'. Choose: strict, normal, fun");

        let error = EngineError::CannotSanctionOwner { action: "mute" };
        assert_eq!(error.to_string(), "This user is the owner, I cannot mute this user!");

        assert_eq!(EngineError::NotYourTurn.to_string(), "Not your turn!");
        assert_eq!(EngineError::CellOccupied.to_string(), "Already taken!");
    }

    #[test]
    fn test_messenger_errors_become_external_failures() {
        let error = EngineError::from(MessengerError::Platform("Missing Permissions".to_string()));
        assert!(matches!(error, EngineError::ExternalCallFailed(ref detail) if detail.contains("Missing Permissions")));
    }

    #[test]
    fn test_duration_error_passes_through() {
        let error = EngineError::from(DurationError::InvalidDuration("soon".to_string()));
        assert!(error.to_string().starts_with("Invalid duration 'soon'"));
    }
}
