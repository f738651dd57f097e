use media_relay_core::fetcher::{list_outputs, output_prefix_of};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Result of a temp-file removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStatus {
    /// The file was deleted.
    Removed,
    /// The file did not exist anymore.
    AlreadyGone,
    /// Deletion failed; the error was logged.
    Failed,
}

/// Delete a downloaded file after a grace interval.
///
/// The grace interval gives the transport time to release the file after an
/// upload; shutdown cuts it short. Errors are logged and never returned, so
/// calling this twice on the same path is harmless.
pub async fn cleanup_temp_file(
    path: &Path,
    grace: Duration,
    cancel: &CancellationToken,
) -> CleanupStatus {
    if !grace.is_zero() {
        tokio::select! {
            () = tokio::time::sleep(grace) => {}
            () = cancel.cancelled() => {
                debug!(path = %path.display(), "Shutdown requested, skipping cleanup grace");
            }
        }
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Cleaned up file");
            CleanupStatus::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "File already removed");
            CleanupStatus::AlreadyGone
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to delete file");
            CleanupStatus::Failed
        }
    }
}

/// Delete a delivered file and every other file the same request left behind.
///
/// `path` is removed through [`cleanup_temp_file`] after the grace interval.
/// Then every regular file sharing its `dl_<id>.` prefix (separate format
/// streams, partial downloads) is removed from the same directory. The
/// returned status is the one for `path`.
pub async fn cleanup_request_files(
    path: &Path,
    grace: Duration,
    cancel: &CancellationToken,
) -> CleanupStatus {
    let status = cleanup_temp_file(path, grace, cancel).await;

    let (Some(dir), Some(prefix)) = (path.parent(), output_prefix_of(path)) else {
        return status;
    };

    match list_outputs(dir, &prefix).await {
        Ok(leftovers) => {
            for (leftover, _) in leftovers {
                cleanup_temp_file(&leftover, Duration::ZERO, cancel).await;
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to scan for leftover files"),
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_file() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dl_abc.mp4");
        tokio::fs::write(&path, b"data").await?;

        let status = cleanup_temp_file(&path, Duration::ZERO, &CancellationToken::new()).await;
        assert_eq!(status, CleanupStatus::Removed);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_second_cleanup_is_harmless() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dl_abc.mp4");
        tokio::fs::write(&path, b"data").await?;
        let cancel = CancellationToken::new();

        assert_eq!(
            cleanup_temp_file(&path, Duration::ZERO, &cancel).await,
            CleanupStatus::Removed
        );
        assert_eq!(
            cleanup_temp_file(&path, Duration::ZERO, &cancel).await,
            CleanupStatus::AlreadyGone
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_is_reported_as_failure() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let status = cleanup_temp_file(dir.path(), Duration::ZERO, &CancellationToken::new()).await;
        assert_eq!(status, CleanupStatus::Failed);
        assert!(dir.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancellation_skips_grace() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dl_abc.jpg");
        tokio::fs::write(&path, b"data").await?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = tokio::time::timeout(
            Duration::from_secs(5),
            cleanup_temp_file(&path, Duration::from_secs(3600), &cancel),
        )
        .await
        .map_err(|_| std::io::Error::other("grace was not skipped"))?;
        assert_eq!(status, CleanupStatus::Removed);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_cleanup_removes_sibling_formats() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let delivered = dir.path().join("dl_0123abcd4567.f137.mp4");
        let audio = dir.path().join("dl_0123abcd4567.f140.m4a");
        let partial = dir.path().join("dl_0123abcd4567.mp4.part");
        let unrelated = dir.path().join("dl_89ef0123abcd.mp4");
        for path in [&delivered, &audio, &partial, &unrelated] {
            tokio::fs::write(path, b"data").await?;
        }

        let status =
            cleanup_request_files(&delivered, Duration::ZERO, &CancellationToken::new()).await;

        assert_eq!(status, CleanupStatus::Removed);
        assert!(!delivered.exists());
        assert!(!audio.exists());
        assert!(!partial.exists());
        assert!(unrelated.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_request_cleanup_of_foreign_name_removes_only_that_file() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("video.mp4");
        let other = dir.path().join("video.mp4.part");
        tokio::fs::write(&path, b"data").await?;
        tokio::fs::write(&other, b"data").await?;

        let status = cleanup_request_files(&path, Duration::ZERO, &CancellationToken::new()).await;

        assert_eq!(status, CleanupStatus::Removed);
        assert!(other.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_request_cleanup_in_missing_directory() {
        let path = Path::new("/nonexistent/dl_0123abcd4567.mp4");
        let status = cleanup_request_files(path, Duration::ZERO, &CancellationToken::new()).await;
        assert_eq!(status, CleanupStatus::AlreadyGone);
    }
}
