//! Per-request lifecycle coordinator.
//!
//! Every inbound message walks an explicit state machine:
//!
//! ```text
//! Received -> Classified -> Finished(Ignored | CommandReplied)          -> CleanedUp
//!                        -> Downloading -> Delivering -> Finished(...) -> CleanedUp
//! ```
//!
//! Each transition is a call to [`RequestCoordinator::step`], so stages can be
//! driven one at a time in tests. Nothing here returns an error to the caller:
//! fetch and send failures become status-message edits, and cleanup failures
//! are logged.

use crate::cleanup::cleanup_request_files;
use crate::message::InboundMessage;
use crate::texts::{
    DOWNLOADING_TEXT, GENERIC_FAILURE_TEXT, MISSING_TEXT, PHOTO_CAPTION, START_TEXT,
    TOO_LARGE_TEXT, VIDEO_CAPTION,
};
use crate::transport::{MessageRef, RelayTransport, TextFormat};
use media_relay_core::classifier::{classify, Classification};
use media_relay_core::fetcher::{DownloadResult, MediaFetcher};
use media_relay_core::policy::{DeliveryAction, DeliveryPolicy};
use media_relay_core::utils::format_megabytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Kind of media that was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Sent through the photo endpoint.
    Photo,
    /// Sent through the video endpoint.
    Video,
}

/// Why a download request did not end in a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The initial status message could not be sent; nothing was fetched.
    StatusUnavailable,
    /// The fetch produced no usable file.
    Missing,
    /// The file exceeded the local size limit.
    TooLarge,
    /// Uploading the file failed.
    SendFailed,
}

/// Final result of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Not a command and not a supported link; no reply.
    Ignored,
    /// The capability message was sent.
    CommandReplied,
    /// The capability message could not be sent.
    ReplyFailed,
    /// The media was delivered and the status message removed.
    Delivered(MediaKind),
    /// The status message was left with a failure text.
    DeliveryFailed(FailureReason),
}

/// Lifecycle state of a single request.
#[derive(Debug)]
pub enum RequestState {
    /// Message accepted, nothing decided yet.
    Received,
    /// Classification done.
    Classified(Classification),
    /// Status message sent, downloader about to run.
    Downloading {
        /// The transient status message.
        status: MessageRef,
        /// Link handed to the fetcher.
        url: String,
    },
    /// Fetch finished, policy not applied yet.
    Delivering {
        /// The transient status message.
        status: MessageRef,
        /// Link handed to the fetcher.
        url: String,
        /// What the fetcher produced.
        result: DownloadResult,
    },
    /// Outcome known; the temp file (if any) still has to go.
    Finished {
        /// Final outcome.
        outcome: RequestOutcome,
        /// File to delete during cleanup, along with every sibling sharing
        /// its `dl_<id>.` prefix.
        temp_file: Option<PathBuf>,
    },
    /// Terminal state.
    CleanedUp(RequestOutcome),
}

/// Tunables for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Delay before a downloaded file is deleted.
    pub cleanup_grace: Duration,
    /// Size gate and media-kind lookup.
    pub policy: DeliveryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cleanup_grace: Duration::from_secs(2),
            policy: DeliveryPolicy::default(),
        }
    }
}

/// Drives inbound messages through classification, fetch, delivery and cleanup.
///
/// Holds no per-request state, so one instance is shared by all concurrent
/// update tasks.
pub struct RequestCoordinator<T: RelayTransport> {
    transport: Arc<T>,
    fetcher: Arc<dyn MediaFetcher>,
    config: CoordinatorConfig,
    cancel: CancellationToken,
}

impl<T: RelayTransport> RequestCoordinator<T> {
    /// Create a coordinator bound to a transport, a fetcher and the process-wide
    /// cancellation token.
    pub fn new(
        transport: Arc<T>,
        fetcher: Arc<dyn MediaFetcher>,
        config: CoordinatorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            fetcher,
            config,
            cancel,
        }
    }

    /// Handle one inbound message to completion.
    #[instrument(
        skip(self, msg),
        fields(chat_id = msg.chat_id, user_id = msg.user_id, username = %msg.display_name)
    )]
    pub async fn handle(&self, msg: InboundMessage) -> RequestOutcome {
        let mut state = RequestState::Received;
        loop {
            state = match state {
                RequestState::CleanedUp(outcome) => return outcome,
                other => self.step(&msg, other).await,
            };
        }
    }

    /// Advance a request by one transition.
    pub async fn step(&self, msg: &InboundMessage, state: RequestState) -> RequestState {
        match state {
            RequestState::Received => RequestState::Classified(classify(&msg.text)),
            RequestState::Classified(classification) => self.on_classified(msg, classification).await,
            RequestState::Downloading { status, url } => {
                let result = self.download(msg, &url).await;
                RequestState::Delivering {
                    status,
                    url,
                    result,
                }
            }
            RequestState::Delivering {
                status,
                url,
                result,
            } => {
                let temp_file = result.file_path().map(Path::to_path_buf);
                let outcome = self.deliver(msg, status, &url, result).await;
                RequestState::Finished { outcome, temp_file }
            }
            RequestState::Finished { outcome, temp_file } => {
                if let Some(path) = temp_file {
                    cleanup_request_files(&path, self.config.cleanup_grace, &self.cancel).await;
                }
                RequestState::CleanedUp(outcome)
            }
            done @ RequestState::CleanedUp(_) => done,
        }
    }

    async fn on_classified(&self, msg: &InboundMessage, classification: Classification) -> RequestState {
        let outcome = match classification {
            Classification::Unsupported => {
                debug!(text = %msg.text, "Ignored unsupported link/text");
                RequestOutcome::Ignored
            }
            Classification::Command => {
                info!(text = %msg.text, "Command received");
                match self
                    .transport
                    .send_text(msg.chat_id, START_TEXT, TextFormat::Html)
                    .await
                {
                    Ok(_) => RequestOutcome::CommandReplied,
                    Err(e) => {
                        error!(error = %e, "Failed to send capability message");
                        RequestOutcome::ReplyFailed
                    }
                }
            }
            Classification::SupportedLink(url) => {
                match self
                    .transport
                    .send_text(msg.chat_id, DOWNLOADING_TEXT, TextFormat::Plain)
                    .await
                {
                    Ok(status) => return RequestState::Downloading { status, url },
                    Err(e) => {
                        error!(url = %url, error = %e, "Failed to send status message");
                        RequestOutcome::DeliveryFailed(FailureReason::StatusUnavailable)
                    }
                }
            }
        };

        RequestState::Finished {
            outcome,
            temp_file: None,
        }
    }

    async fn download(&self, msg: &InboundMessage, url: &str) -> DownloadResult {
        info!(url = %url, "Starting download");
        let result = self.fetcher.fetch(url, &self.cancel).await;

        match &result {
            DownloadResult::Success { .. } => {}
            DownloadResult::Empty => {
                warn!(url = %url, "Download returned no file");
            }
            DownloadResult::Failure(e) => {
                error!(
                    user_id = msg.user_id,
                    username = %msg.display_name,
                    url = %url,
                    error = %e,
                    "Error processing URL"
                );
            }
        }

        result
    }

    async fn deliver(
        &self,
        msg: &InboundMessage,
        status: MessageRef,
        url: &str,
        result: DownloadResult,
    ) -> RequestOutcome {
        let result = refresh_from_disk(result).await;
        let action = self.config.policy.decide(&result);

        let (kind, path, size_bytes) = match (action, &result) {
            (DeliveryAction::DeliverPhoto, DownloadResult::Success { path, size_bytes, .. }) => {
                (MediaKind::Photo, path.as_path(), *size_bytes)
            }
            (DeliveryAction::DeliverVideo, DownloadResult::Success { path, size_bytes, .. }) => {
                (MediaKind::Video, path.as_path(), *size_bytes)
            }
            (DeliveryAction::RejectTooLarge, DownloadResult::Success { size_bytes, .. }) => {
                warn!(url = %url, size_mb = %format_megabytes(*size_bytes), "File too big");
                self.edit_status(msg.chat_id, status, TOO_LARGE_TEXT).await;
                return RequestOutcome::DeliveryFailed(FailureReason::TooLarge);
            }
            _ => {
                self.edit_status(msg.chat_id, status, MISSING_TEXT).await;
                return RequestOutcome::DeliveryFailed(FailureReason::Missing);
            }
        };

        let sent = match kind {
            MediaKind::Photo => {
                self.transport
                    .send_photo(msg.chat_id, path, PHOTO_CAPTION)
                    .await
            }
            MediaKind::Video => {
                self.transport
                    .send_video(msg.chat_id, path, VIDEO_CAPTION, true)
                    .await
            }
        };

        match sent {
            Ok(()) => {
                info!(
                    url = %url,
                    kind = ?kind,
                    size_mb = %format_megabytes(size_bytes),
                    "Sent file successfully"
                );
                if let Err(e) = self.transport.delete_message(msg.chat_id, status).await {
                    warn!(error = %e, "Failed to delete status message");
                }
                RequestOutcome::Delivered(kind)
            }
            Err(e) => {
                error!(url = %url, error = %e, "Failed to send file");
                self.edit_status(msg.chat_id, status, GENERIC_FAILURE_TEXT).await;
                RequestOutcome::DeliveryFailed(FailureReason::SendFailed)
            }
        }
    }

    async fn edit_status(&self, chat_id: i64, status: MessageRef, text: &str) {
        if let Err(e) = self.transport.edit_text(chat_id, status, text).await {
            warn!(error = %e, "Failed to edit status message");
        }
    }
}

/// Re-check a successful result against the file on disk.
///
/// A file that vanished becomes `Empty`; otherwise the current size replaces
/// the one seen by the fetcher.
async fn refresh_from_disk(result: DownloadResult) -> DownloadResult {
    let DownloadResult::Success { path, .. } = result else {
        return result;
    };

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => DownloadResult::success(path, metadata.len()),
        Ok(_) => {
            warn!(path = %path.display(), "Downloaded path is not a regular file");
            DownloadResult::Empty
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Downloaded file missing at delivery time");
            DownloadResult::Empty
        }
    }
}
