//! Runs the fetcher against small executable shell scripts that imitate the
//! downloader. Options arrive first, so `$1` is `-o` and `$2` the output
//! template; the URL is always the last argument.
#![cfg(unix)]

use media_relay_core::config::RelaySettings;
use media_relay_core::fetcher::{DownloadResult, FetchError, MediaFetcher, YtDlpFetcher};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://www.tiktok.com/@user/video/1";

const WRITE_MP4: &str = r#"out=$(printf '%s' "$2" | sed 's/%(ext)s/mp4/')
printf 'fake media' > "$out"
echo "[download] Destination: $out"
"#;

const RECORD_ARGS: &str = r#"printf '%s\n' "$@" > "$(dirname "$2")/args.txt""#;

fn fetcher_in(dir: &Path, program: &Path) -> YtDlpFetcher {
    let settings = RelaySettings {
        download_dir: dir.to_path_buf(),
        cookies_path: dir.join("cookies.txt"),
        ..RelaySettings::default()
    };
    YtDlpFetcher::new(&settings).with_program(program)
}

fn write_script(dir: &Path, body: &str) -> std::io::Result<PathBuf> {
    let path = dir.join("fake-downloader");
    std::fs::write(&path, format!("#!/bin/sh\n{body}"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn recorded_args(dir: &Path) -> std::io::Result<Vec<String>> {
    let args = std::fs::read_to_string(dir.join("args.txt"))?;
    Ok(args.lines().map(str::to_string).collect())
}

#[tokio::test]
async fn produced_file_is_success() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), WRITE_MP4)?;

    let result = fetcher_in(dir.path(), &script)
        .fetch(URL, &CancellationToken::new())
        .await;

    let DownloadResult::Success {
        path,
        size_bytes,
        extension,
    } = &result
    else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(extension, "mp4");
    assert_eq!(*size_bytes, 10);
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    assert!(name.is_some_and(|n| n.starts_with("dl_") && n.ends_with(".mp4")));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_with_file_is_still_success() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), &format!("{WRITE_MP4}exit 1\n"))?;

    let result = fetcher_in(dir.path(), &script)
        .fetch(URL, &CancellationToken::new())
        .await;

    assert!(matches!(result, DownloadResult::Success { .. }), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn no_file_is_empty_even_on_clean_exit() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "echo 'ERROR: Private video' >&2\nexit 0\n")?;

    let result = fetcher_in(dir.path(), &script)
        .fetch(URL, &CancellationToken::new())
        .await;

    assert!(matches!(result, DownloadResult::Empty), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn missing_program_is_failure() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let fetcher = fetcher_in(dir.path(), &dir.path().join("no-such-downloader"));

    let result = fetcher
        .fetch("https://tiktok.com/@u/video/1", &CancellationToken::new())
        .await;

    assert!(
        matches!(result, DownloadResult::Failure(FetchError::Spawn { .. })),
        "{result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn cookies_are_passed_through_when_present() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("cookies.txt"), "# Netscape HTTP Cookie File\n")?;
    let script = write_script(dir.path(), RECORD_ARGS)?;

    let result = fetcher_in(dir.path(), &script)
        .fetch(URL, &CancellationToken::new())
        .await;
    assert!(matches!(result, DownloadResult::Empty), "{result:?}");

    let args = recorded_args(dir.path())?;
    assert_eq!(args[0], "-o");
    assert!(args[1].ends_with(".%(ext)s"));
    assert_eq!(&args[2..5], ["--no-playlist", "--max-filesize", "50M"]);
    assert_eq!(args[5], "--cookies");
    assert!(args[6].ends_with("cookies.txt"));
    assert_eq!(&args[7..], ["--", URL]);
    Ok(())
}

#[tokio::test]
async fn option_like_url_arrives_after_separator() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), RECORD_ARGS)?;
    let hostile = "--update-to=evil/x.com@latest";

    let result = fetcher_in(dir.path(), &script)
        .fetch(hostile, &CancellationToken::new())
        .await;
    assert!(matches!(result, DownloadResult::Empty), "{result:?}");

    let args = recorded_args(dir.path())?;
    assert_eq!(args.len(), 7, "{args:?}");
    assert_eq!(&args[5..], ["--", hostile]);
    assert_eq!(args.iter().filter(|a| a.as_str() == hostile).count(), 1);
    Ok(())
}

#[tokio::test]
async fn cancellation_kills_downloader_and_removes_partial_output() -> std::io::Result<()> {
    let dir = tempfile::tempdir()?;
    let script = write_script(
        dir.path(),
        r#"out=$(printf '%s' "$2" | sed 's/%(ext)s/mp4/')
printf 'partial' > "$out.part"
exec sleep 30
"#,
    )?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watched = dir.path().to_path_buf();
    tokio::spawn(async move {
        // Wait for the partial file so cancellation hits a running download
        for _ in 0..200 {
            let has_partial = std::fs::read_dir(&watched)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .any(|e| e.file_name().to_string_lossy().ends_with(".part"))
                })
                .unwrap_or(false);
            if has_partial {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        fetcher_in(dir.path(), &script).fetch(URL, &cancel),
    )
    .await
    .map_err(|_| std::io::Error::other("fetch did not stop on cancellation"))?;

    assert!(
        matches!(result, DownloadResult::Failure(FetchError::Cancelled)),
        "{result:?}"
    );
    let leftovers: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("dl_"))
        .collect();
    assert!(leftovers.is_empty(), "leftover files: {leftovers:?}");
    Ok(())
}
