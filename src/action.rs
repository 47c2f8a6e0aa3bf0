//! Outbound actions
//!
//! Handlers return a list of these instead of talking to the platform. The
//! Discord adapter renders them.

use crate::callback::CallbackPayload;
use crate::types::{ChatId, MessageRef};

/// A single button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: CallbackPayload,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: CallbackPayload) -> Self {
        Self {
            label: label.into(),
            payload,
        }
    }
}

/// Rows of buttons attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    #[must_use]
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// One button per row
    #[must_use]
    pub fn column(buttons: Vec<Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|button| vec![button]).collect(),
        }
    }
}

/// Something the platform adapter should do on the engine's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    /// Post a message
    SendText {
        chat: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Replace the text and buttons of an earlier message. `None` removes the buttons.
    EditMessage {
        message: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Post a poll
    SendPoll {
        chat: ChatId,
        question: String,
        options: Vec<String>,
    },
    /// Short notice shown only to the user who triggered the event
    Notice { text: String },
}

impl OutboundAction {
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self::SendText {
            chat,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(chat: ChatId, text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self::SendText {
            chat,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice { text: text.into() }
    }

    /// The text carried by this action, if any
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::SendText { text, .. }
            | Self::EditMessage { text, .. }
            | Self::Notice { text } => Some(text),
            Self::SendPoll { question, .. } => Some(question),
        }
    }
}
