//! Event dispatcher
//!
//! Turns inbound events into calls on the engines and the engines' results
//! into [`OutboundAction`]s. Chat-type and admin gating happen here, with the
//! actor's role queried live on every gated invocation.

use crate::action::{Button, Keyboard, OutboundAction};
use crate::assistant::{AssistantService, Completion, CompletionError};
use crate::callback::CallbackPayload;
use crate::config::{BotConfig, DenialMode, DispatchConfig};
use crate::duration::parse_duration;
use crate::error::EngineError;
use crate::game::{GameEngine, GameStore};
use crate::messenger::Messenger;
use crate::moderation::{AutoMode, ModerationStore, SanctionEngine, SanctionLedger};
use crate::target::{Resolution, Unresolved, resolve_target};
use crate::types::{ChatId, ChatRef, GroupId, MembershipStatus, MessageRef, UserId};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Most options a poll may carry
pub const MAX_POLL_OPTIONS: usize = 10;

/// A text command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub chat: ChatRef,
    pub actor: UserId,
    /// Command name without the prefix
    pub name: String,
    /// Whitespace-separated arguments
    pub args: Vec<String>,
    /// Author of the message the command replied to
    pub reply_to: Option<UserId>,
}

/// A button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEvent {
    pub chat: ChatRef,
    pub actor: UserId,
    /// Message carrying the button
    pub message: MessageRef,
    /// Raw payload string
    pub payload: String,
}

/// A member joined or left a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEvent {
    pub group: GroupId,
    /// Where member messages go; `None` if the group has no such channel
    pub channel: Option<ChatId>,
    pub subject: UserId,
    pub old: Option<MembershipStatus>,
    pub new: MembershipStatus,
}

/// Plain text sent to the bot in a private chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessageEvent {
    pub chat: ChatId,
    pub actor: UserId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(CommandEvent),
    Callback(CallbackEvent),
    Membership(MembershipEvent),
    /// The bot was removed from a group
    BotRemoved(GroupId),
    DirectMessage(DirectMessageEvent),
}

/// Every command the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Start,
    Help,
    AddToGroup,
    NewChat,
    ClearChat,
    IncognitoMode,
    ChatHistory,
    SwitchModel,
    Instructions,
    Ban,
    Unban,
    TempBan,
    Mute,
    Unmute,
    Warning,
    RemoveWarnings,
    CheckWarnings,
    Role,
    RemoveRole,
    SetAutoMode,
    RemoveAutoMode,
    WelcomeMessage,
    LeavingMessage,
    Poll,
    TicTacToe,
}

impl CommandName {
    pub const ALL: [Self; 25] = [
        Self::Start,
        Self::Help,
        Self::AddToGroup,
        Self::NewChat,
        Self::ClearChat,
        Self::IncognitoMode,
        Self::ChatHistory,
        Self::SwitchModel,
        Self::Instructions,
        Self::Ban,
        Self::Unban,
        Self::TempBan,
        Self::Mute,
        Self::Unmute,
        Self::Warning,
        Self::RemoveWarnings,
        Self::CheckWarnings,
        Self::Role,
        Self::RemoveRole,
        Self::SetAutoMode,
        Self::RemoveAutoMode,
        Self::WelcomeMessage,
        Self::LeavingMessage,
        Self::Poll,
        Self::TicTacToe,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::AddToGroup => "addtogroup",
            Self::NewChat => "newchat",
            Self::ClearChat => "clearchat",
            Self::IncognitoMode => "incognitomode",
            Self::ChatHistory => "chathistory",
            Self::SwitchModel => "switchmodel",
            Self::Instructions => "instructions",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::TempBan => "tempban",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Warning => "warning",
            Self::RemoveWarnings => "removewarnings",
            Self::CheckWarnings => "checkwarnings",
            Self::Role => "role",
            Self::RemoveRole => "removerole",
            Self::SetAutoMode => "setautomode",
            Self::RemoveAutoMode => "removeautomode",
            Self::WelcomeMessage => "welcomemessage",
            Self::LeavingMessage => "leavingmessage",
            Self::Poll => "poll",
            Self::TicTacToe => "tictactoe",
        }
    }

    /// Requires a group chat and an administrator
    #[must_use]
    pub const fn is_gated(self) -> bool {
        matches!(
            self,
            Self::Ban
                | Self::Unban
                | Self::TempBan
                | Self::Mute
                | Self::Unmute
                | Self::Warning
                | Self::RemoveWarnings
                | Self::Role
                | Self::RemoveRole
                | Self::SetAutoMode
                | Self::RemoveAutoMode
                | Self::WelcomeMessage
                | Self::LeavingMessage
        )
    }
}

impl FromStr for CommandName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|command| command.as_str() == name)
            .ok_or(())
    }
}

fn reply(chat: ChatId, text: impl Into<String>) -> Vec<OutboundAction> {
    vec![OutboundAction::text(chat, text)]
}

/// Failure line for a sanction attempt
fn failure(verb: &str, error: &EngineError) -> String {
    match error {
        EngineError::ExternalCallFailed(detail) => format!("Failed to {verb}: {detail}"),
        other => other.to_string(),
    }
}

/// Arguments after the subject reference, without resolving it
fn trailing_args(args: &[String], reply_to: Option<UserId>) -> &[String] {
    if reply_to.is_some() {
        args
    } else {
        args.get(1..).unwrap_or_default()
    }
}

/// Routes events to the engines
#[derive(Clone)]
pub struct Dispatcher {
    sanctions: SanctionEngine,
    games: GameEngine,
    assistant: AssistantService,
    messenger: Arc<dyn Messenger>,
    policy: DispatchConfig,
    prefix: String,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        completion: Arc<dyn Completion>,
        config: &BotConfig,
    ) -> Self {
        Self {
            sanctions: SanctionEngine::new(
                ModerationStore::new(),
                SanctionLedger::new(),
                Arc::clone(&messenger),
                config.moderation.policy(),
            ),
            games: GameEngine::new(GameStore::new(), Arc::clone(&messenger)),
            assistant: AssistantService::new(completion, config.assistant.settings()),
            messenger,
            policy: config.dispatch.clone(),
            prefix: config.command_prefix.clone(),
        }
    }

    #[must_use]
    pub const fn sanctions(&self) -> &SanctionEngine {
        &self.sanctions
    }

    #[must_use]
    pub const fn games(&self) -> &GameEngine {
        &self.games
    }

    #[must_use]
    pub const fn assistant(&self) -> &AssistantService {
        &self.assistant
    }

    /// Handle one event. Never fails; problems become messages.
    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundAction> {
        match event {
            InboundEvent::Command(command) => self.handle_command(command).await,
            InboundEvent::Callback(callback) => self.handle_callback(callback).await,
            InboundEvent::Membership(membership) => self.handle_membership(&membership),
            InboundEvent::BotRemoved(group) => {
                self.sanctions.evict_group(group);
                let games = self.games.evict_group(group);
                info!(guild_id = %group, games, "Removed from group, state evicted");
                Vec::new()
            }
            InboundEvent::DirectMessage(message) => self.handle_direct_message(message).await,
        }
    }

    fn mention(&self, user: UserId) -> String {
        self.messenger.mention(user)
    }

    fn usage(&self, syntax: &str) -> String {
        format!("Usage: {}{syntax}", self.prefix)
    }

    /// Admin gate for a group.
    ///
    /// `Err` carries what to send instead: nothing for private chats and
    /// unauthorized groups, and a denial for non-admins depending on the
    /// denial mode.
    async fn admin_gate(
        &self,
        chat: &ChatRef,
        actor: UserId,
        require_authorization: bool,
        denial: impl FnOnce(&'static str) -> OutboundAction,
    ) -> Result<GroupId, Vec<OutboundAction>> {
        let Some(group) = chat.group else {
            return Err(Vec::new());
        };

        if require_authorization
            && self.policy.require_authorization
            && !self.sanctions.store().is_authorized(group)
        {
            debug!(guild_id = %group, "Group not authorized, ignoring");
            return Err(Vec::new());
        }

        let is_admin = match self.messenger.get_role(group, actor).await {
            Ok(role) => role.is_admin(),
            Err(e) => {
                warn!(guild_id = %group, user_id = %actor, error = %e, "Role lookup failed, treating as member");
                false
            }
        };

        if is_admin {
            return Ok(group);
        }

        info!(guild_id = %group, user_id = %actor, "Denied non-admin");
        match self.policy.denial {
            DenialMode::Explicit => Err(vec![denial(NOT_ADMIN)]),
            DenialMode::Silent => Err(Vec::new()),
        }
    }

    /// Resolve the subject of a command, or the message explaining why not
    async fn subject(
        &self,
        event: &CommandEvent,
        syntax: &str,
    ) -> Result<(UserId, Vec<String>), Vec<OutboundAction>> {
        let target =
            resolve_target(self.messenger.as_ref(), &event.chat, &event.args, event.reply_to).await;
        match target.resolution {
            Resolution::Resolved(user) => Ok((user, target.rest)),
            Resolution::Unresolved(Unresolved::Missing) => {
                Err(reply(event.chat.id, self.usage(syntax)))
            }
            Resolution::Unresolved(reason) => Err(reply(event.chat.id, reason.message())),
        }
    }

    async fn handle_command(&self, event: CommandEvent) -> Vec<OutboundAction> {
        let Ok(command) = event.name.parse::<CommandName>() else {
            debug!(name = %event.name, "Unknown command");
            return Vec::new();
        };

        let group = if command.is_gated() {
            let chat_id = event.chat.id;
            match self
                .admin_gate(&event.chat, event.actor, true, |text| {
                    OutboundAction::text(chat_id, text)
                })
                .await
            {
                Ok(group) => Some(group),
                Err(actions) => return actions,
            }
        } else {
            event.chat.group
        };

        let chat = event.chat.id;
        match (command, group) {
            (CommandName::Start | CommandName::Help, _) => reply(chat, self.help_text()),
            (CommandName::AddToGroup, None) => {
                reply(chat, "👥 Use this command in a group to authorize the bot.")
            }
            (CommandName::AddToGroup, Some(_)) => vec![OutboundAction::with_keyboard(
                chat,
                "🔐 Group Authorization Required\nOnly group admins can enable bot features.\nTap below to confirm:",
                Keyboard::column(vec![Button::new(
                    "✅ Authorize Bot for This Group",
                    CallbackPayload::Authorize,
                )]),
            )],
            (CommandName::NewChat | CommandName::ClearChat, _) => {
                self.assistant.new_chat(event.actor);
                reply(chat, "🆕 Chat history cleared.")
            }
            (CommandName::IncognitoMode, _) => {
                if self.assistant.toggle_incognito(event.actor) {
                    reply(chat, "❌ Incognito mode ON.")
                } else {
                    reply(chat, "💾 Incognito mode OFF.")
                }
            }
            (CommandName::ChatHistory, _) => match self.assistant.history_text(event.actor) {
                Some(text) => reply(chat, format!("📜 Recent Chat:\n\n{text}")),
                None => reply(chat, "📜 No chat history."),
            },
            (CommandName::SwitchModel, _) => self.switch_model(&event),
            (CommandName::Instructions, _) => {
                if event.args.is_empty() {
                    return reply(chat, self.usage("instructions <your instruction>"));
                }
                self.assistant
                    .set_instructions(event.actor, &event.args.join(" "));
                reply(chat, "🧠 Custom instructions set!")
            }
            (CommandName::CheckWarnings, _) => self.check_warnings(&event, group).await,
            (CommandName::Poll, _) => self.poll(&event),
            (CommandName::TicTacToe, _) => self.tictactoe(&event).await,
            (gated, Some(group)) => self.moderate(gated, group, &event).await,
            (_, None) => Vec::new(),
        }
    }

    fn help_text(&self) -> String {
        let p = &self.prefix;
        format!(
            "hello, how can i assist you?\n\
             {p}help — shows all commands\n\
             {p}newchat — clear memory\n\
             {p}incognitomode — stop or resume remembering the chat\n\
             {p}chathistory — view recent messages\n\
             {p}instructions — set custom behavior\n\
             {p}switchmodel — choose AI model\n\
             {p}addtogroup — authorize in groups\n\n\
             Moderation (admins): {p}ban {p}unban {p}tempban {p}mute {p}unmute {p}warning \
             {p}removewarnings {p}role {p}removerole {p}setautomode {p}removeautomode \
             {p}welcomemessage {p}leavingmessage\n\
             Everyone: {p}checkwarnings {p}poll {p}tictactoe"
        )
    }

    fn switch_model(&self, event: &CommandEvent) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        let Some(model) = event.args.first() else {
            return vec![OutboundAction::with_keyboard(
                chat,
                "⚙️ Choose a model:",
                self.assistant.model_keyboard(),
            )];
        };

        match self.assistant.switch_model(event.actor, model) {
            Ok(()) => reply(chat, format!("⚙️ Model switched to {model}")),
            Err(e) => reply(
                chat,
                format!("{e} Use {}switchmodel without arguments for options.", self.prefix),
            ),
        }
    }

    async fn check_warnings(
        &self,
        event: &CommandEvent,
        group: Option<GroupId>,
    ) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        let subject = if event.args.is_empty() && event.reply_to.is_none() {
            event.actor
        } else {
            match self.subject(event, "checkwarnings [user]").await {
                Ok((user, _)) => user,
                Err(actions) => return actions,
            }
        };

        let count = group.map_or(0, |group| self.sanctions.check_warnings(group, subject));
        if count == 0 {
            reply(chat, "📋 No warnings found.")
        } else {
            reply(
                chat,
                format!("📋 {} has {count} warning(s).", self.mention(subject)),
            )
        }
    }

    fn poll(&self, event: &CommandEvent) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        if event.args.len() < 2 {
            return reply(chat, self.usage("poll Question | Option1 | Option2 | ..."));
        }

        let full = event.args.join(" ");
        if !full.contains('|') {
            return reply(chat, "Separate question and options with '|'");
        }

        let mut parts = full.split('|').map(str::trim);
        let question = parts.next().unwrap_or_default().to_string();
        let options: Vec<String> = parts
            .filter(|option| !option.is_empty())
            .map(ToString::to_string)
            .collect();

        if question.is_empty() {
            return reply(chat, self.usage("poll Question | Option1 | Option2 | ..."));
        }
        if options.len() < 2 {
            return reply(chat, "Need at least 2 options.");
        }
        if options.len() > MAX_POLL_OPTIONS {
            return reply(
                chat,
                format!("A poll can have at most {MAX_POLL_OPTIONS} options."),
            );
        }

        vec![OutboundAction::SendPoll {
            chat,
            question,
            options,
        }]
    }

    async fn tictactoe(&self, event: &CommandEvent) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        if event.args.is_empty() && event.reply_to.is_none() {
            return if event.chat.is_group() {
                reply(chat, self.usage("tictactoe <@opponent>"))
            } else {
                reply(chat, "Start a game in a server by tagging someone.")
            };
        }

        match self
            .games
            .start(event.chat, event.actor, &event.args, event.reply_to)
            .await
        {
            Ok(session) => {
                let text = self.games.describe(&session);
                match GameEngine::keyboard(&session) {
                    Some(keyboard) => vec![OutboundAction::with_keyboard(chat, text, keyboard)],
                    None => reply(chat, text),
                }
            }
            Err(e) => reply(chat, e.to_string()),
        }
    }

    async fn moderate(
        &self,
        command: CommandName,
        group: GroupId,
        event: &CommandEvent,
    ) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        match command {
            CommandName::Ban => {
                let (user, _) = match self.subject(event, "ban <user> [reason]").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                match self.sanctions.ban(group, user).await {
                    Ok(()) => reply(
                        chat,
                        format!("{}, you have been banned from this group!", self.mention(user)),
                    ),
                    Err(e) => reply(chat, failure("ban", &e)),
                }
            }
            CommandName::Unban => {
                let (user, _) = match self.subject(event, "unban <user>").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                match self.sanctions.unban(group, user).await {
                    Ok(()) => reply(chat, format!("{} has been unbanned.", self.mention(user))),
                    Err(e) => reply(chat, failure("unban", &e)),
                }
            }
            CommandName::TempBan | CommandName::Mute => self.timed_sanction(command, group, event).await,
            CommandName::Unmute => {
                let (user, _) = match self.subject(event, "unmute <user>").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                match self.sanctions.unmute(group, user).await {
                    Ok(()) => reply(chat, format!("{} unmuted.", self.mention(user))),
                    Err(e) => reply(chat, failure("unmute", &e)),
                }
            }
            CommandName::Warning => self.warning(group, event).await,
            CommandName::RemoveWarnings => {
                let (user, _) = match self.subject(event, "removewarnings <user>").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                self.sanctions.clear_warnings(group, user);
                reply(chat, format!("🧹 Warnings cleared for {}.", self.mention(user)))
            }
            CommandName::Role => {
                if trailing_args(&event.args, event.reply_to).is_empty() {
                    return reply(chat, self.usage("role <user> <role>"));
                }
                let (user, rest) = match self.subject(event, "role <user> <role>").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                let role = rest.join(" ");
                match self.sanctions.set_role(group, user, &role).await {
                    Ok(()) => reply(
                        chat,
                        format!("🎭 Role '{role}' assigned to {}.", self.mention(user)),
                    ),
                    Err(e) => reply(chat, e.to_string()),
                }
            }
            CommandName::RemoveRole => {
                let (user, _) = match self.subject(event, "removerole <user>").await {
                    Ok(found) => found,
                    Err(actions) => return actions,
                };
                self.sanctions.remove_role(group, user);
                reply(chat, format!("❌ Role removed from {}.", self.mention(user)))
            }
            CommandName::SetAutoMode => {
                let Some(mode) = event.args.first() else {
                    return vec![OutboundAction::with_keyboard(
                        chat,
                        "⚙️ Select auto mode:",
                        auto_mode_keyboard(),
                    )];
                };
                match self.sanctions.set_auto_mode(group, mode) {
                    Ok(mode) => reply(chat, format!("⚙️ Auto mode set to: {mode}")),
                    Err(e) => reply(chat, e.to_string()),
                }
            }
            CommandName::RemoveAutoMode => {
                self.sanctions.reset_auto_mode(group);
                reply(
                    chat,
                    format!("🚫 Auto mode reset to {}.", AutoMode::default()),
                )
            }
            CommandName::WelcomeMessage => {
                if event.args.is_empty() {
                    return reply(chat, self.usage("welcomemessage <text>"));
                }
                self.sanctions
                    .set_welcome_template(group, &event.args.join(" "));
                reply(chat, "👋 Welcome message set!")
            }
            CommandName::LeavingMessage => {
                if event.args.is_empty() {
                    return reply(chat, self.usage("leavingmessage <text>"));
                }
                self.sanctions
                    .set_leaving_template(group, &event.args.join(" "));
                reply(chat, "😢 Leaving message set!")
            }
            _ => Vec::new(),
        }
    }

    /// Temporary ban or mute. The duration is validated before the subject is
    /// looked up, so a bad duration never reaches the platform.
    async fn timed_sanction(
        &self,
        command: CommandName,
        group: GroupId,
        event: &CommandEvent,
    ) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        let (syntax, verb) = if command == CommandName::Mute {
            ("mute <user> <duration>", "mute")
        } else {
            ("tempban <user> <duration>", "tempban")
        };

        let duration_text = trailing_args(&event.args, event.reply_to).join(" ");
        if duration_text.is_empty() {
            return reply(chat, self.usage(syntax));
        }
        if let Err(e) = parse_duration(&duration_text) {
            return reply(chat, e.to_string());
        }

        let (user, _) = match self.subject(event, syntax).await {
            Ok(found) => found,
            Err(actions) => return actions,
        };

        let result = if command == CommandName::Mute {
            self.sanctions.mute(group, user, &duration_text).await
        } else {
            self.sanctions.temp_ban(group, user, &duration_text).await
        };

        match result {
            Ok(until) => {
                let done = if command == CommandName::Mute { "muted" } else { "banned" };
                reply(
                    chat,
                    format!(
                        "{} {done} until {}",
                        self.mention(user),
                        until.format("%Y-%m-%d %H:%M UTC")
                    ),
                )
            }
            Err(e) => reply(chat, failure(verb, &e)),
        }
    }

    async fn warning(&self, group: GroupId, event: &CommandEvent) -> Vec<OutboundAction> {
        let chat = event.chat.id;
        let syntax = "warning <user> <reason>";
        if trailing_args(&event.args, event.reply_to).is_empty() {
            return reply(chat, self.usage(syntax));
        }

        let (user, rest) = match self.subject(event, syntax).await {
            Ok(found) => found,
            Err(actions) => return actions,
        };
        let reason = rest.join(" ");

        let result = match self.sanctions.warn(group, user, &reason).await {
            Ok(result) => result,
            Err(e) => return reply(chat, e.to_string()),
        };

        let policy = self.sanctions.policy();
        let mention = self.mention(user);
        let mut actions = reply(
            chat,
            format!(
                "⚠️ Warning issued to {mention} ({}/{}): {reason}",
                result.count, policy.warning_threshold
            ),
        );

        if result.escalated {
            let text = match result.escalation_failure {
                None => format!(
                    "🚨 {mention} auto-banned for {}h after {} warnings.",
                    policy.auto_ban.as_secs() / 3600,
                    policy.warning_threshold
                ),
                Some(e) => failure("ban", &e),
            };
            actions.push(OutboundAction::text(chat, text));
        }
        actions
    }

    async fn handle_callback(&self, event: CallbackEvent) -> Vec<OutboundAction> {
        let payload = match event.payload.parse::<CallbackPayload>() {
            Ok(payload) => payload,
            Err(e) => {
                debug!(payload = %event.payload, error = %e, "Rejected callback payload");
                return vec![OutboundAction::notice(e.to_string())];
            }
        };

        match payload {
            CallbackPayload::Move { game, cell } => {
                match self.games.apply_move(game, event.actor, cell) {
                    Ok(session) => vec![OutboundAction::EditMessage {
                        message: event.message,
                        text: self.games.describe(&session),
                        keyboard: GameEngine::keyboard(&session),
                    }],
                    Err(e) => vec![OutboundAction::notice(e.to_string())],
                }
            }
            CallbackPayload::AutoMode(mode) => {
                let group = match self
                    .admin_gate(&event.chat, event.actor, true, OutboundAction::notice)
                    .await
                {
                    Ok(group) => group,
                    Err(actions) => return actions,
                };
                self.sanctions.store().set_mode(group, mode);
                info!(guild_id = %group, mode = %mode, "Auto mode changed");
                vec![OutboundAction::EditMessage {
                    message: event.message,
                    text: format!("⚙️ Auto mode set to: {mode}"),
                    keyboard: None,
                }]
            }
            CallbackPayload::Model(model) => match self.assistant.switch_model(event.actor, &model) {
                Ok(()) => vec![OutboundAction::EditMessage {
                    message: event.message,
                    text: format!("⚙️ Model switched to {model}"),
                    keyboard: None,
                }],
                Err(e) => vec![OutboundAction::notice(e.to_string())],
            },
            CallbackPayload::Authorize => {
                let group = match self
                    .admin_gate(&event.chat, event.actor, false, |_| {
                        OutboundAction::notice("Only admins can authorize the bot.")
                    })
                    .await
                {
                    Ok(group) => group,
                    Err(actions) => return actions,
                };
                if self.sanctions.store().authorize(group) {
                    info!(guild_id = %group, user_id = %event.actor, "Group authorized");
                }
                vec![OutboundAction::EditMessage {
                    message: event.message,
                    text: "✅ Bot authorized for group use!".to_string(),
                    keyboard: None,
                }]
            }
        }
    }

    fn handle_membership(&self, event: &MembershipEvent) -> Vec<OutboundAction> {
        if self.policy.require_authorization && !self.sanctions.store().is_authorized(event.group)
        {
            return Vec::new();
        }
        let Some(channel) = event.channel else {
            return Vec::new();
        };

        let text = match (event.old, event.new) {
            (None, MembershipStatus::Member) => {
                self.sanctions.render_welcome(event.group, event.subject)
            }
            (Some(MembershipStatus::Member), MembershipStatus::Left | MembershipStatus::Kicked) => {
                self.sanctions.render_leaving(event.group, event.subject)
            }
            _ => return Vec::new(),
        };
        reply(channel, text)
    }

    async fn handle_direct_message(&self, event: DirectMessageEvent) -> Vec<OutboundAction> {
        let text = event.text.trim();
        if text.is_empty() || text.starts_with(&self.prefix) {
            return Vec::new();
        }

        match self.assistant.chat(event.actor, text).await {
            Ok(answer) => reply(event.chat, answer),
            Err(CompletionError::Disabled) => reply(event.chat, CompletionError::Disabled.to_string()),
            Err(_) => reply(event.chat, "❌ Error generating response. Try again."),
        }
    }
}

const NOT_ADMIN: &str = "You must be an admin to use this command.";

fn auto_mode_keyboard() -> Keyboard {
    Keyboard::column(
        AutoMode::ALL
            .into_iter()
            .map(|mode| Button::new(mode.label(), CallbackPayload::AutoMode(mode)))
            .collect(),
    )
}
