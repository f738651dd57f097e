use crate::config::{DOWNLOAD_FILE_PREFIX, REMOTE_MAX_FILESIZE};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Hex characters of the correlation id (48 bits of randomness).
const CORRELATION_ID_LEN: usize = 12;

/// A single download: target URL plus the collision-free output naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// URL handed to the downloader.
    pub url: String,
    /// Random token unique to this request.
    pub correlation_id: String,
    /// Directory the output lands in.
    pub download_dir: PathBuf,
    /// Output template with the downloader's extension placeholder.
    pub output_template: PathBuf,
}

impl DownloadRequest {
    /// Create a request with a fresh correlation id.
    #[must_use]
    pub fn new(url: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        let correlation_id = simple[..CORRELATION_ID_LEN].to_string();
        Self::with_id(url, download_dir, correlation_id)
    }

    /// Create a request with a caller-chosen correlation id.
    #[must_use]
    pub fn with_id(
        url: impl Into<String>,
        download_dir: impl Into<PathBuf>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let download_dir = download_dir.into();
        let correlation_id = correlation_id.into();
        let output_template =
            download_dir.join(format!("{DOWNLOAD_FILE_PREFIX}{correlation_id}.%(ext)s"));
        Self {
            url: url.into(),
            correlation_id,
            download_dir,
            output_template,
        }
    }

    /// Filename prefix shared by every file this request may produce.
    #[must_use]
    pub fn output_prefix(&self) -> String {
        format!("{DOWNLOAD_FILE_PREFIX}{}.", self.correlation_id)
    }
}

/// Correlation prefix (`dl_<id>.`) of a file produced by a request, or `None`
/// if the name does not follow the output template.
#[must_use]
pub fn output_prefix_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(DOWNLOAD_FILE_PREFIX)?;
    let id = &rest[..rest.find('.')?];
    if id.is_empty() {
        return None;
    }
    Some(format!("{DOWNLOAD_FILE_PREFIX}{id}."))
}

/// Build the downloader argument vector for a request.
///
/// `-o <template> --no-playlist --max-filesize 50M [--cookies <path>] -- <url>`
///
/// The URL comes from chat text, so it is placed after `--` and can never be
/// parsed as a downloader option.
#[must_use]
pub fn build_args(request: &DownloadRequest, cookies: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-o".into(),
        request.output_template.clone().into_os_string(),
        "--no-playlist".into(),
        "--max-filesize".into(),
        REMOTE_MAX_FILESIZE.into(),
    ];

    if let Some(path) = cookies {
        args.push("--cookies".into());
        args.push(path.as_os_str().to_os_string());
    }

    args.push("--".into());
    args.push(request.url.clone().into());
    args
}
