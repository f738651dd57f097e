#![deny(missing_docs)]
//! Media Relay core library.
//!
//! Link classification, the downloader subprocess wrapper, delivery policy
//! and shared settings. Nothing in here knows about a chat transport.

/// Inbound text classification.
pub mod classifier;
/// Configuration management.
pub mod config;
/// External downloader invocation.
pub mod fetcher;
/// Accept/reject and media-kind selection for fetched files.
pub mod policy;
/// Utility functions.
pub mod utils;

pub use classifier::{classify, Classification};
pub use fetcher::{DownloadRequest, DownloadResult, FetchError, MediaFetcher, YtDlpFetcher};
pub use policy::{DeliveryAction, DeliveryPolicy};
