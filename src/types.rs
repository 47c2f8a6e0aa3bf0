//! Identifiers and small value types shared by the engines and the adapter.
//!
//! The engines never see serenity types. The Discord adapter converts at the
//! edge so the moderation and game logic stay platform-neutral.

use derive_more::{Display, From};

/// A platform user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct UserId(pub u64);

/// A place messages are sent to (a guild text channel or a DM channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct ChatId(pub u64);

/// A moderated group (a guild). Moderation state is keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct GroupId(pub u64);

/// Where an event originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef {
    /// Channel to reply into
    pub id: ChatId,
    /// Owning group, `None` for private chats
    pub group: Option<GroupId>,
}

impl ChatRef {
    #[must_use]
    pub const fn group(id: ChatId, group: GroupId) -> Self {
        Self {
            id,
            group: Some(group),
        }
    }

    #[must_use]
    pub const fn private(id: ChatId) -> Self {
        Self { id, group: None }
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        self.group.is_some()
    }
}

/// A message previously sent by the bot, used as an edit target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message_id: u64,
}

/// Role of a user inside a group, as reported live by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemberRole {
    #[display("member")]
    Member,
    #[display("administrator")]
    Administrator,
    #[display("creator")]
    Creator,
}

impl MemberRole {
    /// Administrators and the creator may run moderation commands
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Administrator | Self::Creator)
    }
}

/// Membership status carried by join/leave events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipStatus {
    Member,
    Left,
    Kicked,
}
