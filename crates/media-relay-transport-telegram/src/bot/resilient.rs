//! Resilient status-message operations with automatic retry.
//!
//! Status sends, edits and deletes are retried on transient failures using
//! exponential backoff with jitter. Media uploads are single attempt and do
//! not go through here.
//!
//! # Usage
//!
//! ```ignore
//! use media_relay_transport_telegram::bot::resilient::{send_message_resilient, edit_message_safe_resilient};
//!
//! let msg = send_message_resilient(&bot, chat_id, "⏳ ...", None).await?;
//! edit_message_safe_resilient(&bot, chat_id, msg.id, "❌ ...").await?;
//! ```

use anyhow::Result;
use media_relay_core::utils::{retry_telegram_operation, truncate_str};
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId, ParseMode};
use tracing::debug;

/// Telegram rejects message texts above 4096 characters.
const MAX_TEXT_CHARS: usize = 4000;

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_EDIT_NOT_FOUND: &str = "message to edit not found";
const ERROR_DELETE_NOT_FOUND: &str = "message to delete not found";

/// Send a message with automatic retry on network failures.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    parse_mode: Option<ParseMode>,
) -> Result<Message> {
    let text = text.into();
    retry_telegram_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(pm) = parse_mode {
            req = req.parse_mode(pm);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Edit a message with automatic retry on network failures.
///
/// Returns `Ok(None)` when Telegram reports the text as unchanged or the
/// message as gone; neither is worth retrying.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
) -> Result<Option<Message>> {
    let text = text.into();
    retry_telegram_operation(|| async {
        match bot.edit_message_text(chat_id, msg_id, text.clone()).await {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains(ERROR_NOT_MODIFIED) || err_msg.contains(ERROR_EDIT_NOT_FOUND) {
                    debug!("Message update skipped: {err_msg}");
                    return Ok(None);
                }
                Err(anyhow::anyhow!("Telegram edit error: {e}"))
            }
        }
    })
    .await
}

/// Edit a status message, tolerating the expected failure modes.
///
/// Over-long text is truncated. "Not modified" and "not found" count as
/// success since the user already sees a final state or nothing at all.
///
/// # Errors
///
/// Returns an error for any other failure once retries are exhausted.
pub async fn edit_message_safe_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> Result<()> {
    let text = if text.chars().count() > MAX_TEXT_CHARS {
        format!("{}...", truncate_str(text, MAX_TEXT_CHARS))
    } else {
        text.to_string()
    };

    edit_message_resilient(bot, chat_id, msg_id, text).await?;
    Ok(())
}

/// Delete a message with automatic retry; an already-deleted message is not
/// an error.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn delete_message_resilient(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> Result<()> {
    retry_telegram_operation(|| async {
        match bot.delete_message(chat_id, msg_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains(ERROR_DELETE_NOT_FOUND) => {
                debug!("Message delete skipped: {e}");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Telegram delete error: {e}")),
        }
    })
    .await
}
