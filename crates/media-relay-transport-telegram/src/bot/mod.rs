/// Update handlers and the command list
pub mod handlers;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// `RelayTransport` implementation backed by the Bot API
pub mod transport;

pub use transport::TelegramRelayTransport;
