use dotenvy::dotenv;
use media_relay_core::config::{get_log_dir, get_log_max_files, RelaySettings};
use media_relay_transport_telegram::config::{BotSettings, TelegramSettings};
use media_relay_transport_telegram::health::serve_health;
use media_relay_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting bot tokens
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let output = self.token1.replace_all(input, "$1[TELEGRAM_TOKEN]$3");
        let output = self.token2.replace_all(&output, "[TELEGRAM_TOKEN]");
        self.token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer counts as fully written even if redaction changed its length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Held until exit so buffered file output is flushed
    let _log_guard = init_logging(patterns);

    info!("Bot starting...");

    let Some(settings) = init_settings() else {
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let health = tokio::spawn({
        let port = settings.relay.health_port;
        let cancel = cancel.clone();
        async move {
            if let Err(e) = serve_health(port, cancel).await {
                error!("Health listener failed: {e:#}");
            }
        }
    });

    if let Err(e) = run_bot(settings, cancel.clone()).await {
        error!("Bot dropped with critical error: {e:#}");
    }

    cancel.cancel();
    if let Err(e) = health.await {
        warn!("Health listener task ended abnormally: {e}");
    }

    info!("Bot stopped");
    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) -> Option<WorkerGuard> {
    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "media_relay_core=info,media_relay_runtime=info,media_relay_transport_telegram=info,media_relay_telegram_bot=info,hyper=warn,reqwest=warn,tokio=warn,tower=warn,teloxide=warn",
            )
        })
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(RedactingMakeWriter::new(io::stderr, patterns.clone()));

    let log_dir = get_log_dir();
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("bot")
        .filename_suffix("log")
        .max_log_files(get_log_max_files())
        .build(&log_dir);

    match appender {
        Ok(appender) => {
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(RedactingMakeWriter::new(
                    move || file_writer.clone(),
                    patterns,
                ));

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            warn!(
                "File logging disabled, cannot open {}: {e}",
                log_dir.display()
            );
            None
        }
    }
}

/// Load settings; `None` means the process should stop without serving.
fn init_settings() -> Option<Arc<BotSettings>> {
    let relay_settings = match RelaySettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load relay configuration: {}", e);
            return None;
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            return None;
        }
    };

    if telegram_settings.token().is_none() {
        error!("TELEGRAM_BOT_TOKEN is not found!");
        return None;
    }

    info!("Configuration loaded successfully.");
    Some(Arc::new(BotSettings::new(relay_settings, telegram_settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> RedactionPatterns {
        match RedactionPatterns::new() {
            Ok(p) => p,
            Err(e) => panic!("patterns compile: {e}"),
        }
    }

    #[test]
    fn test_redacts_token_in_api_url() {
        let line = "GET https://api.telegram.org/bot123456789:AAH-abc_def/getMe failed";
        assert_eq!(
            patterns().redact(line),
            "GET https://api.telegram.org/bot[TELEGRAM_TOKEN]/getMe failed"
        );
    }

    #[test]
    fn test_redacts_bare_token() {
        let line = "token=1234567890:ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghi end";
        let redacted = patterns().redact(line);
        assert!(!redacted.contains("ABCDEFGHIJ"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        let line = "Sent file successfully url=https://www.tiktok.com/@u/video/1";
        assert_eq!(patterns().redact(line), line);
    }

    #[test]
    fn test_writer_reports_input_length() {
        let mut out = Vec::new();
        {
            let mut writer = RedactingWriter::new(&mut out, Arc::new(patterns()));
            let input = b"bot123456789:secret";
            assert!(matches!(writer.write(input), Ok(n) if n == input.len()));
        }
        assert_eq!(String::from_utf8_lossy(&out), "bot123456789:[TELEGRAM_TOKEN]");
    }
}
