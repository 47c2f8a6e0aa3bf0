use crate::discord::{chat_id, chat_ref, deliver, group_id, user_id};
use crate::dispatcher::{CallbackEvent, DirectMessageEvent, InboundEvent, MembershipEvent};
use crate::types::{ChatId, MembershipStatus, MessageRef};
use crate::{Data, EVENT_TARGET, Error};
use poise::serenity_prelude::{self as serenity, FullEvent, GuildId, Interaction};
use tracing::{debug, info, warn};

/// Framework-wide event handler
///
/// # Errors
/// A failed Discord request while delivering the dispatcher's actions
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            let user_name = &data_about_bot.user.name;
            let shard_id = ctx.shard_id;
            info!(target: EVENT_TARGET, "Connected as {user_name}, shard {shard_id}");
        }
        FullEvent::CacheReady { guilds } => {
            let guild_count_cache = ctx.cache.guild_count();
            let guild_count = guilds.len();
            if guild_count != guild_count_cache {
                warn!(
                    target: EVENT_TARGET,
                    "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
                );
            }
            info!(target: EVENT_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(interaction),
        } => {
            let event = InboundEvent::Callback(CallbackEvent {
                chat: chat_ref(interaction.channel_id, interaction.guild_id),
                actor: user_id(interaction.user.id),
                message: MessageRef {
                    chat: chat_id(interaction.channel_id),
                    message_id: interaction.message.id.get(),
                },
                payload: interaction.data.custom_id.clone(),
            });
            let actions = data.handle(event).await;
            deliver::respond_to_component(&ctx.http, interaction, actions).await?;
        }
        FullEvent::GuildMemberAddition { new_member } => {
            if new_member.user.bot {
                return Ok(());
            }
            let event = InboundEvent::Membership(MembershipEvent {
                group: group_id(new_member.guild_id),
                channel: system_channel(ctx, new_member.guild_id).await,
                subject: user_id(new_member.user.id),
                old: None,
                new: MembershipStatus::Member,
            });
            let actions = data.handle(event).await;
            deliver::send_actions(&ctx.http, actions).await?;
        }
        FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            if user.bot {
                return Ok(());
            }
            // Discord does not say whether the member left or was kicked
            let event = InboundEvent::Membership(MembershipEvent {
                group: group_id(*guild_id),
                channel: system_channel(ctx, *guild_id).await,
                subject: user_id(user.id),
                old: Some(MembershipStatus::Member),
                new: MembershipStatus::Left,
            });
            let actions = data.handle(event).await;
            deliver::send_actions(&ctx.http, actions).await?;
        }
        FullEvent::GuildDelete { incomplete, .. } => {
            if incomplete.unavailable {
                debug!(target: EVENT_TARGET, guild_id = %incomplete.id, "Guild outage, keeping state");
                return Ok(());
            }
            data.handle(InboundEvent::BotRemoved(group_id(incomplete.id)))
                .await;
        }
        FullEvent::Message { new_message } => {
            if new_message.guild_id.is_some() || new_message.author.bot {
                return Ok(());
            }
            // Commands in DMs are handled by the framework
            if new_message.content.starts_with(&data.config.command_prefix) {
                return Ok(());
            }
            let _typing = new_message.channel_id.start_typing(&ctx.http);
            let event = InboundEvent::DirectMessage(DirectMessageEvent {
                chat: chat_id(new_message.channel_id),
                actor: user_id(new_message.author.id),
                text: new_message.content.clone(),
            });
            let actions = data.handle(event).await;
            deliver::send_actions(&ctx.http, actions).await?;
        }
        _ => {}
    }
    Ok(())
}

/// Where member messages go: the guild's system channel, if it has one
async fn system_channel(ctx: &serenity::Context, guild: GuildId) -> Option<ChatId> {
    let cached = ctx.cache.guild(guild).map(|guild| guild.system_channel_id);
    let channel = match cached {
        Some(channel) => channel,
        None => guild
            .to_partial_guild(&ctx.http)
            .await
            .map_err(|e| warn!(target: EVENT_TARGET, guild_id = %guild, error = %e, "Failed to fetch guild"))
            .ok()
            .and_then(|guild| guild.system_channel_id),
    };
    channel.map(chat_id)
}
