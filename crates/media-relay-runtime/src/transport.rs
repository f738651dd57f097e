//! Chat transport seam used by the coordinator.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Identifier of a message sent by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i32);

/// How message text should be interpreted by the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// Sent verbatim.
    Plain,
    /// Telegram-flavoured HTML.
    Html,
}

/// Outbound chat operations needed to serve one request.
#[async_trait]
pub trait RelayTransport: Send + Sync + 'static {
    /// Send a text message and return its id.
    async fn send_text(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<MessageRef>;

    /// Replace the text of a previously sent message.
    async fn edit_text(&self, chat_id: i64, message: MessageRef, text: &str) -> Result<()>;

    /// Delete a previously sent message.
    async fn delete_message(&self, chat_id: i64, message: MessageRef) -> Result<()>;

    /// Upload a local file as a photo.
    async fn send_photo(&self, chat_id: i64, path: &Path, caption: &str) -> Result<()>;

    /// Upload a local file as a video.
    async fn send_video(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
        supports_streaming: bool,
    ) -> Result<()>;
}
