//! Rendering outbound actions on Discord

use crate::action::{Keyboard, OutboundAction};
use crate::discord::to_channel;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditMessage, Http,
    MessageId, ReactionType,
};
use tracing::debug;

/// Longest message body Discord accepts
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Reactions used as poll options, in order
pub const POLL_REACTIONS: [&str; 10] = [
    "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟",
];

/// Split `text` into pieces of at most `limit` characters, preferring to cut
/// at line breaks
#[must_use]
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit.max(1)) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

/// Poll message body: the question and one numbered line per option
#[must_use]
pub fn poll_text(question: &str, options: &[String]) -> String {
    let mut text = format!("📊 **{question}**\n");
    for (emoji, option) in POLL_REACTIONS.iter().zip(options) {
        text.push_str(&format!("\n{emoji} {option}"));
    }
    text
}

fn components(keyboard: Option<&Keyboard>) -> Vec<CreateActionRow> {
    keyboard.map_or_else(Vec::new, |keyboard| {
        keyboard
            .rows
            .iter()
            .map(|row| {
                CreateActionRow::Buttons(
                    row.iter()
                        .map(|button| {
                            CreateButton::new(button.payload.encode())
                                .label(button.label.clone())
                                .style(ButtonStyle::Secondary)
                        })
                        .collect(),
                )
            })
            .collect()
    })
}

/// Carry out actions produced outside an interaction
///
/// # Errors
/// The first failed Discord request
pub async fn send_actions(http: &Http, actions: Vec<OutboundAction>) -> Result<(), serenity::Error> {
    for action in actions {
        match action {
            OutboundAction::SendText {
                chat,
                text,
                keyboard,
            } => {
                let chunks = split_text(&text, MAX_MESSAGE_CHARS);
                let last = chunks.len() - 1;
                for (index, chunk) in chunks.into_iter().enumerate() {
                    let mut message = CreateMessage::new().content(chunk);
                    if index == last {
                        message = message.components(components(keyboard.as_ref()));
                    }
                    to_channel(chat).send_message(http, message).await?;
                }
            }
            OutboundAction::EditMessage {
                message,
                text,
                keyboard,
            } => {
                let edit = EditMessage::new()
                    .content(truncate(&text))
                    .components(components(keyboard.as_ref()));
                to_channel(message.chat)
                    .edit_message(http, MessageId::new(message.message_id), edit)
                    .await?;
            }
            OutboundAction::SendPoll {
                chat,
                question,
                options,
            } => {
                let message = to_channel(chat)
                    .send_message(
                        http,
                        CreateMessage::new().content(truncate(&poll_text(&question, &options))),
                    )
                    .await?;
                for emoji in POLL_REACTIONS.iter().take(options.len()) {
                    message
                        .react(http, ReactionType::Unicode((*emoji).to_string()))
                        .await?;
                }
            }
            OutboundAction::Notice { text } => {
                debug!(text = %text, "Dropping notice outside an interaction");
            }
        }
    }
    Ok(())
}

/// Answer a button press.
///
/// An edit of the pressed message or a notice becomes the interaction
/// response; everything else is sent as usual. Presses that produce neither
/// are acknowledged so the client stops waiting.
///
/// # Errors
/// The first failed Discord request
pub async fn respond_to_component(
    http: &Http,
    interaction: &ComponentInteraction,
    actions: Vec<OutboundAction>,
) -> Result<(), serenity::Error> {
    let mut response = None;
    let mut rest = Vec::new();

    for action in actions {
        if response.is_some() {
            rest.push(action);
            continue;
        }
        match action {
            OutboundAction::EditMessage {
                message,
                text,
                keyboard,
            } if message.message_id == interaction.message.id.get() => {
                response = Some(CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content(truncate(&text))
                        .components(components(keyboard.as_ref())),
                ));
            }
            OutboundAction::Notice { text } => {
                response = Some(CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(truncate(&text))
                        .ephemeral(true),
                ));
            }
            other => rest.push(other),
        }
    }

    interaction
        .create_response(http, response.unwrap_or(CreateInteractionResponse::Acknowledge))
        .await?;

    send_actions(http, rest).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("hello", MAX_MESSAGE_CHARS), vec!["hello"]);
        assert_eq!(split_text("", MAX_MESSAGE_CHARS), vec![""]);
    }

    #[test]
    fn test_split_prefers_line_breaks() {
        let chunks = split_text("aaaa\nbbbb\ncc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cc"]);
    }

    #[test]
    fn test_long_line_is_cut() {
        let text = "é".repeat(25);
        let chunks = split_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_poll_text() {
        let text = poll_text("Lunch?", &["Pizza".to_string(), "Sushi".to_string()]);
        assert_eq!(text, "📊 **Lunch?**\n\n1️⃣ Pizza\n2️⃣ Sushi");
    }

    #[test]
    fn test_keyboard_rows() {
        use crate::action::Button;
        use crate::callback::CallbackPayload;

        let keyboard = Keyboard::column(vec![
            Button::new("a", CallbackPayload::Authorize),
            Button::new("b", CallbackPayload::Model("m".into())),
        ]);
        assert_eq!(components(Some(&keyboard)).len(), 2);
        assert!(components(None).is_empty());
    }
}
