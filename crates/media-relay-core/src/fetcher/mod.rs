//! Media fetcher: resolves a URL into a local file by running the external
//! downloader.
//!
//! The downloader chooses the final file extension, so each request embeds a
//! random correlation id in its output template and finds its own file
//! afterwards by filename prefix. Exit codes are not interpreted: a matching
//! output file is the only success signal.

mod request;
mod ytdlp;

pub use request::{build_args, output_prefix_of, DownloadRequest};
pub use ytdlp::{find_output, list_outputs, resolve_tool_path, YtDlpFetcher};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors raised while running the downloader.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The downloader process could not be started.
    #[error("failed to start downloader {program}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Waiting for the downloader to exit failed.
    #[error("failed to await downloader exit: {0}")]
    Wait(#[source] std::io::Error),
    /// The download directory could not be scanned for output.
    #[error("failed to scan download directory: {0}")]
    Scan(#[source] std::io::Error),
    /// Shutdown was requested while the downloader was running.
    #[error("download cancelled")]
    Cancelled,
}

/// Outcome of a single fetch.
#[derive(Debug)]
pub enum DownloadResult {
    /// The downloader left a matching file behind.
    Success {
        /// Path of the downloaded file.
        path: PathBuf,
        /// File size in bytes.
        size_bytes: u64,
        /// Lowercased extension without the dot; empty if none.
        extension: String,
    },
    /// The downloader ran but produced no file.
    Empty,
    /// The downloader could not be run to completion.
    Failure(FetchError),
}

impl DownloadResult {
    /// Build a `Success` from a path and size, deriving the extension.
    #[must_use]
    pub fn success(path: PathBuf, size_bytes: u64) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        Self::Success {
            path,
            size_bytes,
            extension,
        }
    }

    /// Path of the produced file, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Success { path, .. } => Some(path),
            Self::Empty | Self::Failure(_) => None,
        }
    }
}

/// Fetches media for a URL into a local file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url`. Never fails: errors are reported as
    /// [`DownloadResult::Failure`].
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> DownloadResult;
}
