//! Group moderation: warnings, roles, auto-mode, templates and sanctions

mod engine;
mod ledger;
mod mode;
mod store;

pub use engine::{ModerationPolicy, SanctionEngine, USER_PLACEHOLDER, WarnResult};
pub use ledger::{LedgerError, SanctionKind, SanctionLedger, SanctionRecord, SanctionState};
pub use mode::AutoMode;
pub use store::{DEFAULT_LEAVING, DEFAULT_WELCOME, ModerationStore, TemplateKind, WarningTally};
