use crate::error::EngineError;
use derive_more::Display;
use std::str::FromStr;

/// Auto-moderation mode of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum AutoMode {
    /// Warnings escalate to a ban at the threshold
    #[display("strict")]
    Strict,
    #[default]
    #[display("normal")]
    Normal,
    #[display("fun")]
    Fun,
}

impl AutoMode {
    pub const ALL: [Self; 3] = [Self::Strict, Self::Normal, Self::Fun];

    /// Only strict mode turns warnings into sanctions
    #[must_use]
    pub const fn escalates(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Picker button label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict 🔒",
            Self::Normal => "normal ⚖️",
            Self::Fun => "fun 🎉",
        }
    }
}

impl FromStr for AutoMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "normal" => Ok(Self::Normal),
            "fun" => Ok(Self::Fun),
            _ => Err(EngineError::InvalidMode(s.to_string())),
        }
    }
}
