//! [`Messenger`] over the Discord HTTP API

use crate::discord::{to_guild, to_user, user_id};
use crate::messenger::{Messenger, MessengerError, MessengerResult};
use crate::types::{GroupId, MemberRole, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, Http, Member, PartialGuild, Permissions, RoleId};
use std::sync::Arc;
use tracing::{debug, info};

/// Longest timeout Discord accepts
pub const MAX_TIMEOUT_DAYS: i64 = 28;

/// Members fetched per name search
const SEARCH_LIMIT: u64 = 10;

/// Permissions that make a member an administrator for moderation purposes
const ADMIN_PERMISSIONS: Permissions = Permissions::ADMINISTRATOR.union(Permissions::BAN_MEMBERS);

impl From<serenity::Error> for MessengerError {
    fn from(error: serenity::Error) -> Self {
        Self::Platform(error.to_string())
    }
}

/// Extract the id from a `<@123>` or `<@!123>` mention
#[must_use]
pub fn parse_mention(reference: &str) -> Option<UserId> {
    reference
        .strip_prefix("<@")?
        .strip_suffix('>')
        .map(|inner| inner.trim_start_matches('!'))
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|id| *id != 0)
        .map(UserId)
}

/// End of a timeout for the requested expiry, clamped to what Discord allows
#[must_use]
pub fn timeout_until(now: DateTime<Utc>, until: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let limit = now + chrono::Duration::days(MAX_TIMEOUT_DAYS);
    until.map_or(limit, |until| until.min(limit))
}

fn role_of(guild: &PartialGuild, member: &Member) -> MemberRole {
    if guild.owner_id == member.user.id {
        return MemberRole::Creator;
    }

    // The @everyone role shares the guild's id
    let everyone = RoleId::new(guild.id.get());
    let permissions = member
        .roles
        .iter()
        .chain(std::iter::once(&everyone))
        .filter_map(|id| guild.roles.get(id))
        .fold(Permissions::empty(), |acc, role| acc | role.permissions);

    if permissions.intersects(ADMIN_PERMISSIONS) {
        MemberRole::Administrator
    } else {
        MemberRole::Member
    }
}

pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn member(&self, group: GroupId, user: UserId) -> MessengerResult<Member> {
        to_guild(group)
            .member(&*self.http, to_user(user))
            .await
            .map_err(|e| match e {
                serenity::Error::Http(ref http)
                    if http.status_code().map(|status| status.as_u16()) == Some(404) =>
                {
                    MessengerError::MemberNotFound { group, user }
                }
                other => other.into(),
            })
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn resolve_identity(
        &self,
        group: GroupId,
        reference: &str,
    ) -> MessengerResult<Option<UserId>> {
        if let Some(user) = parse_mention(reference) {
            return Ok(Some(user));
        }

        let name = reference.trim_start_matches('@');
        if name.is_empty() {
            return Ok(None);
        }

        let members = to_guild(group)
            .search_members(&*self.http, name, Some(SEARCH_LIMIT))
            .await?;
        debug!(guild_id = %group, name, found = members.len(), "Searched members");

        Ok(members
            .iter()
            .find(|member| {
                member.user.name.eq_ignore_ascii_case(name)
                    || member.display_name().eq_ignore_ascii_case(name)
            })
            .map(|member| user_id(member.user.id)))
    }

    async fn get_role(&self, group: GroupId, user: UserId) -> MessengerResult<MemberRole> {
        let guild = to_guild(group).to_partial_guild(&*self.http).await?;
        let member = self.member(group, user).await?;
        Ok(role_of(&guild, &member))
    }

    async fn apply_ban(
        &self,
        group: GroupId,
        user: UserId,
        until: Option<DateTime<Utc>>,
    ) -> MessengerResult<()> {
        let reason = until.map_or_else(
            || "Banned by a moderator".to_string(),
            |until| format!("Banned until {}", until.format("%Y-%m-%d %H:%M UTC")),
        );
        to_guild(group)
            .ban_with_reason(&*self.http, to_user(user), 0, &reason)
            .await?;
        info!(guild_id = %group, user_id = %user, "Applied ban");
        Ok(())
    }

    async fn apply_unban(&self, group: GroupId, user: UserId) -> MessengerResult<()> {
        to_guild(group).unban(&*self.http, to_user(user)).await?;
        info!(guild_id = %group, user_id = %user, "Lifted ban");
        Ok(())
    }

    async fn apply_restriction(
        &self,
        group: GroupId,
        user: UserId,
        can_send: bool,
        until: Option<DateTime<Utc>>,
    ) -> MessengerResult<Option<DateTime<Utc>>> {
        let mut member = self.member(group, user).await?;

        if can_send {
            member.enable_communication(&*self.http).await?;
            info!(guild_id = %group, user_id = %user, "Timeout removed");
            return Ok(None);
        }

        let applied = timeout_until(Utc::now(), until);
        member
            .disable_communication_until_datetime(&*self.http, applied.into())
            .await?;
        info!(guild_id = %group, user_id = %user, until = %applied, "Timeout applied");
        Ok(Some(applied))
    }

    fn mention(&self, user: UserId) -> String {
        format!("<@{user}>")
    }
}
