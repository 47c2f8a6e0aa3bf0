//! Discord adapter
//!
//! Converts between serenity's ids and the engine's types, implements the
//! [`Messenger`](crate::messenger::Messenger) seam and renders outbound
//! actions as Discord messages and interaction responses.

pub mod deliver;
pub mod messenger;

pub use messenger::DiscordMessenger;

use crate::types::{ChatId, ChatRef, GroupId, UserId};
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId};

#[must_use]
pub fn user_id(id: serenity::UserId) -> UserId {
    UserId(id.get())
}

#[must_use]
pub fn group_id(id: GuildId) -> GroupId {
    GroupId(id.get())
}

#[must_use]
pub fn chat_id(id: ChannelId) -> ChatId {
    ChatId(id.get())
}

/// Guild channels belong to a group; DM channels do not
#[must_use]
pub fn chat_ref(channel: ChannelId, guild: Option<GuildId>) -> ChatRef {
    ChatRef {
        id: chat_id(channel),
        group: guild.map(group_id),
    }
}

pub(crate) fn to_user(user: UserId) -> serenity::UserId {
    serenity::UserId::new(user.0)
}

pub(crate) fn to_guild(group: GroupId) -> GuildId {
    GuildId::new(group.0)
}

pub(crate) fn to_channel(chat: ChatId) -> ChannelId {
    ChannelId::new(chat.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversions() {
        let chat = chat_ref(ChannelId::new(10), Some(GuildId::new(20)));
        assert_eq!(chat, ChatRef::group(ChatId(10), GroupId(20)));
        assert!(!chat_ref(ChannelId::new(10), None).is_group());

        assert_eq!(user_id(to_user(UserId(42))), UserId(42));
        assert_eq!(to_channel(ChatId(7)).get(), 7);
        assert_eq!(group_id(to_guild(GroupId(9))), GroupId(9));
    }
}
