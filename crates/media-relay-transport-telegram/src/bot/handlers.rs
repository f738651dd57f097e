use crate::bot::TelegramRelayTransport;
use media_relay_runtime::{InboundMessage, RequestCoordinator};
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::debug;

/// Coordinator type shared with the dispatcher.
pub type Coordinator = RequestCoordinator<TelegramRelayTransport>;

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the list of supported services
    #[command(description = "Show supported services.")]
    Start,
    /// Same as start
    #[command(description = "How to use the bot.")]
    Help,
}

/// `@username`, else first name, else `Unknown`.
fn get_display_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return format!("@{username}");
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Convert a Telegram text message into the transport-agnostic model.
///
/// Returns `None` for messages without text.
#[must_use]
pub fn inbound_from_message(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    Some(InboundMessage::new(
        msg.chat.id.0,
        get_user_id_safe(msg),
        get_display_name(msg),
        text,
    ))
}

/// Text message endpoint: hands the message to the coordinator.
///
/// # Errors
///
/// Never fails; every failure is reported to the user or logged by the
/// coordinator.
pub async fn handle_text(
    msg: Message,
    coordinator: Arc<Coordinator>,
) -> Result<(), teloxide::RequestError> {
    let Some(inbound) = inbound_from_message(&msg) else {
        return respond(());
    };

    let outcome = coordinator.handle(inbound).await;
    debug!(chat_id = msg.chat.id.0, ?outcome, "Update handled");
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_list() {
        let commands = Command::bot_commands();
        let names: Vec<&str> = commands
            .iter()
            .map(|c| c.command.trim_start_matches('/'))
            .collect();
        assert_eq!(names, vec!["start", "help"]);
    }
}
