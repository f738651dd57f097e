/// A text message received from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the reply goes to.
    pub chat_id: i64,
    /// Sender id, `0` when the transport does not provide one.
    pub user_id: i64,
    /// Username or first name, for logs.
    pub display_name: String,
    /// Raw message text.
    pub text: String,
}

impl InboundMessage {
    /// Create a new inbound message.
    #[must_use]
    pub fn new(
        chat_id: i64,
        user_id: i64,
        display_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            user_id,
            display_name: display_name.into(),
            text: text.into(),
        }
    }
}
