//! Delivery policy: decides whether a fetched file is sent and how.
//!
//! Pure lookup, no I/O. The caller is responsible for re-checking the file on
//! disk right before applying it.

use crate::config::LOCAL_MAX_FILE_BYTES;
use crate::fetcher::DownloadResult;

/// Extensions delivered as photos (still and animated images).
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// What to do with a download result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    /// File exceeds the local size limit.
    RejectTooLarge,
    /// Nothing to deliver.
    RejectMissing,
    /// Send as a photo.
    DeliverPhoto,
    /// Send as a streamable video.
    DeliverVideo,
}

/// Size gate plus extension lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Largest accepted file size in bytes (inclusive).
    pub max_bytes: u64,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_bytes: LOCAL_MAX_FILE_BYTES,
        }
    }
}

impl DeliveryPolicy {
    /// Map a download result to exactly one action.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_relay_core::fetcher::DownloadResult;
    /// use media_relay_core::policy::{DeliveryAction, DeliveryPolicy};
    /// use std::path::PathBuf;
    ///
    /// let policy = DeliveryPolicy::default();
    /// let photo = DownloadResult::success(PathBuf::from("dl_1.JPG"), 1024);
    /// assert_eq!(policy.decide(&photo), DeliveryAction::DeliverPhoto);
    /// assert_eq!(policy.decide(&DownloadResult::Empty), DeliveryAction::RejectMissing);
    /// ```
    #[must_use]
    pub fn decide(&self, result: &DownloadResult) -> DeliveryAction {
        let DownloadResult::Success {
            size_bytes,
            extension,
            ..
        } = result
        else {
            return DeliveryAction::RejectMissing;
        };

        if *size_bytes > self.max_bytes {
            return DeliveryAction::RejectTooLarge;
        }

        if is_photo_extension(extension) {
            DeliveryAction::DeliverPhoto
        } else {
            DeliveryAction::DeliverVideo
        }
    }
}

/// Returns true if the (dot-less) extension is sent as a photo.
#[must_use]
pub fn is_photo_extension(extension: &str) -> bool {
    PHOTO_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}
