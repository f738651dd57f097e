//! Decides whether an inbound text is a command, a supported media link, or
//! something to ignore.
//!
//! Matching is a case-insensitive substring test against a fixed allow-list of
//! host fragments, not URL parsing: surrounding words, query strings and
//! missing schemes all still match.

/// Command prefixes that trigger the static capability reply.
pub const COMMAND_TOKENS: &[&str] = &["/start", "/help"];

/// Host fragments the downloader is expected to handle.
pub const SUPPORTED_SERVICES: &[&str] = &[
    "instagram.com",
    "tiktok.com",
    "youtu",
    "pinterest.com",
    "pin.it",
    "x.com",
    "twitter.com",
];

/// Result of classifying an inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A bot command such as `/start`.
    Command,
    /// Text mentioning a supported service; carries the link to download.
    SupportedLink(String),
    /// Anything else. No reply is sent.
    Unsupported,
}

/// Classify an inbound text message.
///
/// # Examples
///
/// ```
/// use media_relay_core::classifier::{classify, Classification};
///
/// assert_eq!(classify("/start"), Classification::Command);
/// assert_eq!(classify("hello"), Classification::Unsupported);
/// assert!(matches!(
///     classify("look https://www.TikTok.com/@u/video/1"),
///     Classification::SupportedLink(_)
/// ));
/// ```
#[must_use]
pub fn classify(text: &str) -> Classification {
    if COMMAND_TOKENS.iter().any(|token| text.starts_with(token)) {
        return Classification::Command;
    }

    if !contains_supported_service(text) {
        return Classification::Unsupported;
    }

    Classification::SupportedLink(extract_link(text))
}

/// Returns true if the text mentions any supported host fragment.
#[must_use]
pub fn contains_supported_service(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SUPPORTED_SERVICES
        .iter()
        .any(|service| lowered.contains(service))
}

/// Picks the first whitespace-separated token that mentions a supported
/// service, with wrapping punctuation stripped. Falls back to the whole
/// trimmed text.
fn extract_link(text: &str) -> String {
    text.split_whitespace()
        .find(|token| contains_supported_service(token))
        .map(|token| {
            token
                .trim_start_matches(['(', '[', '<', '"', '\''])
                .trim_end_matches([')', ']', '>', ',', ';', '!', '?', '"', '\''])
        })
        .unwrap_or_else(|| text.trim())
        .to_string()
}
