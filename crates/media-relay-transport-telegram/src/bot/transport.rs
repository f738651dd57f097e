use crate::bot::resilient::{
    delete_message_resilient, edit_message_safe_resilient, send_message_resilient,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use media_relay_runtime::{MessageRef, RelayTransport, TextFormat};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ParseMode};

/// Telegram Bot API implementation of [`RelayTransport`].
#[derive(Clone)]
pub struct TelegramRelayTransport {
    bot: Bot,
}

impl TelegramRelayTransport {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

const fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Html => Some(ParseMode::Html),
    }
}

#[async_trait]
impl RelayTransport for TelegramRelayTransport {
    async fn send_text(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<MessageRef> {
        let msg = send_message_resilient(&self.bot, ChatId(chat_id), text, parse_mode(format)).await?;
        Ok(MessageRef(msg.id.0))
    }

    async fn edit_text(&self, chat_id: i64, message: MessageRef, text: &str) -> Result<()> {
        edit_message_safe_resilient(&self.bot, ChatId(chat_id), MessageId(message.0), text).await
    }

    async fn delete_message(&self, chat_id: i64, message: MessageRef) -> Result<()> {
        delete_message_resilient(&self.bot, ChatId(chat_id), MessageId(message.0)).await
    }

    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file(path))
            .caption(caption)
            .await
            .map_err(|e| anyhow!("Telegram photo upload error: {e}"))?;
        Ok(())
    }

    async fn send_video(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
        supports_streaming: bool,
    ) -> Result<()> {
        self.bot
            .send_video(ChatId(chat_id), InputFile::file(path))
            .caption(caption)
            .supports_streaming(supports_streaming)
            .await
            .map_err(|e| anyhow!("Telegram video upload error: {e}"))?;
        Ok(())
    }
}
