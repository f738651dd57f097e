//! Configuration and settings management
//!
//! Loads relay settings from configuration files and environment variables and
//! defines the fixed limits shared by the fetcher and the delivery policy.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Remote size hint handed to the downloader (`--max-filesize`).
///
/// Deliberately looser than [`LOCAL_MAX_FILE_BYTES`]; the gap leaves room for
/// container/metadata overhead that the remote estimate does not include.
pub const REMOTE_MAX_FILESIZE: &str = "50M";

/// Authoritative local size gate. Files strictly larger than this are rejected.
pub const LOCAL_MAX_FILE_BYTES: u64 = 49 * 1024 * 1024;

/// Well-known installation path of the downloader.
pub const YTDLP_WELL_KNOWN_PATH: &str = "/usr/local/bin/yt-dlp";
/// Downloader executable name resolved via `PATH` as a fallback.
pub const YTDLP_PROGRAM_NAME: &str = "yt-dlp";

/// Filename prefix of every downloaded file.
pub const DOWNLOAD_FILE_PREFIX: &str = "dl_";

/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum attempts for Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Default directory for rolling log files.
pub const DEFAULT_LOG_DIR: &str = "logs";
/// Number of daily log files kept on disk.
pub const DEFAULT_LOG_MAX_FILES: usize = 30;

/// Relay settings loaded from configuration files and the environment.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelaySettings {
    /// Directory where downloads are written and scanned for.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Cookie jar passed to the downloader when the file exists.
    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,

    /// Explicit downloader path, bypassing the well-known/PATH lookup.
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Delay before a delivered file is deleted, in milliseconds.
    #[serde(default = "default_cleanup_grace_ms")]
    pub cleanup_grace_ms: u64,

    /// Port of the liveness HTTP listener.
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from("cookies.txt")
}

const fn default_cleanup_grace_ms() -> u64 {
    2000
}

const fn default_health_port() -> u16 {
    8080
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            cookies_path: default_cookies_path(),
            ytdlp_path: None,
            cleanup_grace_ms: default_cleanup_grace_ms(),
            health_port: default_health_port(),
        }
    }
}

impl RelaySettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Grace interval before temp-file deletion.
    #[must_use]
    pub const fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }
}

/// Build the layered configuration shared by every settings struct.
///
/// Sources, later ones winning: `appsettings.json`, `config/default`,
/// `config/{RUN_MODE}`, `config/local`, `APP_`-prefixed environment variables
/// and finally plain environment variables (empty values ignored).
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("appsettings").required(false))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Get the log directory from env or default.
///
/// Environment variable: `LOG_DIR`.
#[must_use]
pub fn get_log_dir() -> PathBuf {
    std::env::var("LOG_DIR")
        .ok()
        .filter(|s| !s.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_DIR), PathBuf::from)
}

/// Get the log retention cap from env or default.
///
/// Environment variable: `LOG_MAX_FILES`.
#[must_use]
pub fn get_log_max_files() -> usize {
    std::env::var("LOG_MAX_FILES")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOG_MAX_FILES)
}
