use crate::discord::{chat_ref, deliver, user_id};
use crate::dispatcher::{CommandEvent, CommandName, InboundEvent};
use crate::{Context, Data, Error};
use poise::command;

/// Every command the bot registers
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        start(),
        help(),
        addtogroup(),
        newchat(),
        clearchat(),
        incognitomode(),
        chathistory(),
        switchmodel(),
        instructions(),
        ban(),
        unban(),
        tempban(),
        mute(),
        unmute(),
        warning(),
        removewarnings(),
        checkwarnings(),
        role(),
        removerole(),
        setautomode(),
        removeautomode(),
        welcomemessage(),
        leavingmessage(),
        poll(),
        tictactoe(),
    ]
}

fn split_args(args: Option<&str>) -> Vec<String> {
    args.map(|text| text.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}

/// Hand the invocation to the dispatcher and deliver what comes back
async fn run(ctx: Context<'_>, command: CommandName, args: Option<String>) -> Result<(), Error> {
    let reply_to = match ctx {
        poise::Context::Prefix(prefix) => prefix
            .msg
            .referenced_message
            .as_ref()
            .map(|message| user_id(message.author.id)),
        poise::Context::Application(_) => None,
    };

    let event = CommandEvent {
        chat: chat_ref(ctx.channel_id(), ctx.guild_id()),
        actor: user_id(ctx.author().id),
        name: command.as_str().to_string(),
        args: split_args(args.as_deref()),
        reply_to,
    };

    let actions = ctx.data().handle(InboundEvent::Command(event)).await;
    deliver::send_actions(ctx.http(), actions).await?;
    Ok(())
}

/// Introduce the bot
#[command(prefix_command)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::Start, None).await
}

/// List the commands
#[command(prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::Help, None).await
}

/// Authorize the bot for this server
#[command(prefix_command)]
pub async fn addtogroup(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::AddToGroup, None).await
}

/// Forget your assistant conversation
#[command(prefix_command)]
pub async fn newchat(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::NewChat, None).await
}

/// Forget your assistant conversation
#[command(prefix_command)]
pub async fn clearchat(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::ClearChat, None).await
}

/// Stop or resume remembering your conversation
#[command(prefix_command)]
pub async fn incognitomode(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::IncognitoMode, None).await
}

/// Show your recent conversation
#[command(prefix_command)]
pub async fn chathistory(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::ChatHistory, None).await
}

/// Pick the assistant model
#[command(prefix_command)]
pub async fn switchmodel(ctx: Context<'_>, #[rest] model: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::SwitchModel, model).await
}

/// Set custom instructions for the assistant
#[command(prefix_command)]
pub async fn instructions(ctx: Context<'_>, #[rest] text: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Instructions, text).await
}

/// Ban a member permanently
#[command(prefix_command)]
pub async fn ban(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Ban, args).await
}

/// Lift a ban
#[command(prefix_command)]
pub async fn unban(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Unban, args).await
}

/// Ban a member for a while, e.g. `tempban @user 2 days`
#[command(prefix_command)]
pub async fn tempban(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::TempBan, args).await
}

/// Time a member out, e.g. `mute @user 30 minutes`
#[command(prefix_command)]
pub async fn mute(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Mute, args).await
}

/// End a timeout
#[command(prefix_command)]
pub async fn unmute(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Unmute, args).await
}

/// Warn a member
#[command(prefix_command)]
pub async fn warning(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Warning, args).await
}

/// Clear a member's warnings
#[command(prefix_command)]
pub async fn removewarnings(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::RemoveWarnings, args).await
}

/// Count warnings, yours by default
#[command(prefix_command)]
pub async fn checkwarnings(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::CheckWarnings, args).await
}

/// Give a member a custom role label
#[command(prefix_command)]
pub async fn role(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Role, args).await
}

/// Remove a member's role label
#[command(prefix_command)]
pub async fn removerole(ctx: Context<'_>, #[rest] args: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::RemoveRole, args).await
}

/// Set the auto-moderation mode: strict, normal or fun
#[command(prefix_command)]
pub async fn setautomode(ctx: Context<'_>, #[rest] mode: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::SetAutoMode, mode).await
}

/// Reset the auto-moderation mode
#[command(prefix_command)]
pub async fn removeautomode(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, CommandName::RemoveAutoMode, None).await
}

/// Set the welcome message; `{user}` is replaced with the newcomer
#[command(prefix_command)]
pub async fn welcomemessage(ctx: Context<'_>, #[rest] text: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::WelcomeMessage, text).await
}

/// Set the leaving message; `{user}` is replaced with the member who left
#[command(prefix_command)]
pub async fn leavingmessage(ctx: Context<'_>, #[rest] text: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::LeavingMessage, text).await
}

/// Start a poll: `poll Question | Option 1 | Option 2`
#[command(prefix_command)]
pub async fn poll(ctx: Context<'_>, #[rest] text: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::Poll, text).await
}

/// Challenge someone to tic-tac-toe
#[command(prefix_command)]
pub async fn tictactoe(ctx: Context<'_>, #[rest] opponent: Option<String>) -> Result<(), Error> {
    run(ctx, CommandName::TicTacToe, opponent).await
}
