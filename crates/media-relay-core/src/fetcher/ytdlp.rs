use super::{build_args, DownloadRequest, DownloadResult, FetchError, MediaFetcher};
use crate::config::{RelaySettings, YTDLP_PROGRAM_NAME, YTDLP_WELL_KNOWN_PATH};
use crate::utils::{format_megabytes, truncate_str};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Maximum characters of downloader output kept in logs
const MAX_DIAGNOSTIC_LENGTH: usize = 2_000;

/// Resolve the downloader executable.
///
/// An explicit override wins; otherwise the well-known installation path is
/// used when present, and finally the bare program name so the OS resolves it
/// from `PATH`.
#[must_use]
pub fn resolve_tool_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let well_known = Path::new(YTDLP_WELL_KNOWN_PATH);
    if well_known.is_file() {
        return well_known.to_path_buf();
    }

    PathBuf::from(YTDLP_PROGRAM_NAME)
}

/// List every regular file in `dir` whose name starts with `prefix`, sorted
/// by name.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub async fn list_outputs(dir: &Path, prefix: &str) -> std::io::Result<Vec<(PathBuf, u64)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found: Vec<(String, PathBuf, u64)> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            found.push((name, entry.path(), metadata.len()));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().map(|(_, path, size)| (path, size)).collect())
}

/// Find the first file in `dir` whose name starts with `prefix`.
///
/// Entries are compared by name so the choice is stable when the downloader
/// leaves more than one file behind.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub async fn find_output(dir: &Path, prefix: &str) -> std::io::Result<Option<(PathBuf, u64)>> {
    Ok(list_outputs(dir, prefix).await?.into_iter().next())
}

/// Fetcher backed by a local `yt-dlp` process.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: PathBuf,
    download_dir: PathBuf,
    cookies_path: PathBuf,
}

impl YtDlpFetcher {
    /// Create a fetcher from relay settings.
    #[must_use]
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            program: resolve_tool_path(settings.ytdlp_path.as_deref()),
            download_dir: settings.download_dir.clone(),
            cookies_path: settings.cookies_path.clone(),
        }
    }

    /// Override the executable, bypassing resolution.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Resolved executable path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn cookies(&self) -> Option<&Path> {
        self.cookies_path
            .is_file()
            .then_some(self.cookies_path.as_path())
    }

    async fn run(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<Output, FetchError> {
        let cookies = self.cookies();
        if cookies.is_some() {
            debug!(cookies = %self.cookies_path.display(), "Passing cookie file to downloader");
        }

        let child = Command::new(&self.program)
            .args(build_args(request, cookies))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        tokio::select! {
            output = child.wait_with_output() => output.map_err(FetchError::Wait),
            () = cancel.cancelled() => {
                // Dropping the wait future drops the child, which kills it.
                warn!(correlation_id = %request.correlation_id, "Download cancelled, downloader killed");
                Err(FetchError::Cancelled)
            }
        }
    }

    async fn remove_partial_output(&self, request: &DownloadRequest) {
        let leftovers = match list_outputs(&self.download_dir, &request.output_prefix()).await {
            Ok(leftovers) => leftovers,
            Err(e) => {
                warn!(error = %e, "Failed to scan for partial downloads");
                return;
            }
        };
        for (path, _) in leftovers {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed partial download"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
            }
        }
    }
}

fn log_diagnostics(request: &DownloadRequest, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    debug!(
        correlation_id = %request.correlation_id,
        stdout = %truncate_str(stdout.trim(), MAX_DIAGNOSTIC_LENGTH),
        stderr = %truncate_str(stderr.trim(), MAX_DIAGNOSTIC_LENGTH),
        "Downloader output"
    );

    if !output.status.success() {
        warn!(
            correlation_id = %request.correlation_id,
            status = %output.status,
            "Downloader exited unsuccessfully"
        );
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    #[instrument(skip(self, cancel), fields(program = %self.program.display()))]
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> DownloadResult {
        let request = DownloadRequest::new(url, self.download_dir.clone());
        debug!(
            correlation_id = %request.correlation_id,
            template = %request.output_template.display(),
            "Starting downloader"
        );

        match self.run(&request, cancel).await {
            Ok(output) => log_diagnostics(&request, &output),
            Err(FetchError::Cancelled) => {
                self.remove_partial_output(&request).await;
                return DownloadResult::Failure(FetchError::Cancelled);
            }
            Err(e) => return DownloadResult::Failure(e),
        }

        match find_output(&self.download_dir, &request.output_prefix()).await {
            Ok(Some((path, size_bytes))) => {
                info!(
                    file = %path.display(),
                    size_mb = %format_megabytes(size_bytes),
                    "Downloaded file"
                );
                DownloadResult::success(path, size_bytes)
            }
            Ok(None) => {
                debug!(correlation_id = %request.correlation_id, "Downloader produced no file");
                DownloadResult::Empty
            }
            Err(e) => DownloadResult::Failure(FetchError::Scan(e)),
        }
    }
}
