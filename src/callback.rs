//! Button callback payloads
//!
//! Every button carries a short versioned string of the form
//! `v1:<tag>:<field>...` with `:` as delimiter. Each tag has a fixed field
//! count, so a payload either parses completely or is rejected.

use crate::game::{CellIndex, GameId};
use crate::moderation::AutoMode;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Protocol version written into every payload
pub const VERSION: &str = "v1";

const DELIMITER: char = ':';

const TAG_MOVE: &str = "ttt";
const TAG_MODE: &str = "mode";
const TAG_MODEL: &str = "model";
const TAG_AUTH: &str = "auth";

/// Errors raised while decoding a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("This button is no longer supported.")]
    UnsupportedVersion(String),

    #[error("Unknown button.")]
    UnknownTag(String),

    #[error("Malformed button data.")]
    FieldCount { tag: String, expected: usize, found: usize },

    #[error("Malformed button data.")]
    InvalidField { tag: String, field: String },
}

/// Decoded button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// Tic-tac-toe move
    Move { game: GameId, cell: CellIndex },
    /// Auto-moderation mode picker
    AutoMode(AutoMode),
    /// Assistant model picker
    Model(String),
    /// Group authorization button
    Authorize,
}

impl CallbackPayload {
    /// Wire form of the payload
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::Move { .. } => TAG_MOVE,
            Self::AutoMode(_) => TAG_MODE,
            Self::Model(_) => TAG_MODEL,
            Self::Authorize => TAG_AUTH,
        }
    }
}

impl fmt::Display for CallbackPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{VERSION}{DELIMITER}{}", self.tag())?;
        match self {
            Self::Move { game, cell } => write!(f, "{DELIMITER}{game}{DELIMITER}{cell}"),
            Self::AutoMode(mode) => write!(f, "{DELIMITER}{mode}"),
            Self::Model(name) => write!(f, "{DELIMITER}{name}"),
            Self::Authorize => Ok(()),
        }
    }
}

impl FromStr for CallbackPayload {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(DELIMITER);

        let version = parts.next().unwrap_or_default();
        if version != VERSION {
            return Err(CallbackError::UnsupportedVersion(version.to_string()));
        }

        let tag = parts.next().unwrap_or_default();
        let fields: Vec<&str> = parts.collect();

        let expect = |expected: usize| {
            if fields.len() == expected {
                Ok(())
            } else {
                Err(CallbackError::FieldCount {
                    tag: tag.to_string(),
                    expected,
                    found: fields.len(),
                })
            }
        };
        let invalid = |field: &str| CallbackError::InvalidField {
            tag: tag.to_string(),
            field: field.to_string(),
        };

        match tag {
            TAG_MOVE => {
                expect(2)?;
                let game = fields[0].parse::<GameId>().map_err(|_| invalid(fields[0]))?;
                let cell = fields[1]
                    .parse::<u8>()
                    .ok()
                    .and_then(CellIndex::new)
                    .ok_or_else(|| invalid(fields[1]))?;
                Ok(Self::Move { game, cell })
            }
            TAG_MODE => {
                expect(1)?;
                let mode = fields[0].parse::<AutoMode>().map_err(|_| invalid(fields[0]))?;
                Ok(Self::AutoMode(mode))
            }
            TAG_MODEL => {
                expect(1)?;
                if fields[0].is_empty() {
                    return Err(invalid(fields[0]));
                }
                Ok(Self::Model(fields[0].to_string()))
            }
            TAG_AUTH => {
                expect(0)?;
                Ok(Self::Authorize)
            }
            other => Err(CallbackError::UnknownTag(other.to_string())),
        }
    }
}
