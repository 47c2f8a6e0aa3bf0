//! Messaging platform seam
//!
//! The engines query identities and roles and request sanctions through this
//! trait. The Discord adapter implements it; tests use the generated mock.

use crate::types::{GroupId, MemberRole, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by the messaging platform
#[derive(Debug, Error)]
pub enum MessengerError {
    /// The platform rejected or failed the request
    #[error("{0}")]
    Platform(String),

    /// The user is not a member of the group
    #[error("Member {user} not found in group {group}")]
    MemberNotFound { group: GroupId, user: UserId },
}

/// Result type for platform calls
pub type MessengerResult<T> = Result<T, MessengerError>;

/// Operations the engines need from the messaging platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Look up a user from a platform reference such as a mention or handle.
    ///
    /// Returns `Ok(None)` when nobody matches.
    async fn resolve_identity(
        &self,
        group: GroupId,
        reference: &str,
    ) -> MessengerResult<Option<UserId>>;

    /// Live role of `user` in `group`. Never cached.
    async fn get_role(&self, group: GroupId, user: UserId) -> MessengerResult<MemberRole>;

    /// Ban `user`, until the given instant if one is set
    async fn apply_ban(
        &self,
        group: GroupId,
        user: UserId,
        until: Option<DateTime<Utc>>,
    ) -> MessengerResult<()>;

    async fn apply_unban(&self, group: GroupId, user: UserId) -> MessengerResult<()>;

    /// Allow or forbid sending messages, until the given instant if one is set.
    ///
    /// Returns when the restriction actually ends, which may be earlier than
    /// `until` if the platform caps its length. `None` when lifting.
    async fn apply_restriction(
        &self,
        group: GroupId,
        user: UserId,
        can_send: bool,
        until: Option<DateTime<Utc>>,
    ) -> MessengerResult<Option<DateTime<Utc>>>;

    /// Text that mentions `user` in an outgoing message
    fn mention(&self, user: UserId) -> String;
}
