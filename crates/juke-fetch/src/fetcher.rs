//! The fetch-and-encode capability: yt-dlp extracts the audio stream,
//! ffmpeg encodes it to mp3.
//!
//! Work happens inside a scoped staging directory created next to the
//! destination file; only a fully encoded file is renamed into place, and
//! dropping the staging guard removes any partial output.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use juke_core::platform;

use crate::api::PlaylistItem;
use crate::error::FetchError;

/// External capability turning one playlist item into an audio file at
/// `final_path`. Implementations must leave nothing behind on failure.
pub trait MediaFetcher: Send + Sync + 'static {
    fn fetch_audio(
        &self,
        item: &PlaylistItem,
        final_path: &Path,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// Production fetcher shelling out to yt-dlp and ffmpeg.
pub struct YtDlpFetcher {
    yt_dlp: PathBuf,
    ffmpeg: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp: PathBuf, ffmpeg: PathBuf) -> Self {
        Self { yt_dlp, ffmpeg }
    }

    /// Locate both binaries via the platform search order.
    pub fn discover() -> Result<Self, FetchError> {
        let yt_dlp = platform::find_yt_dlp_binary().ok_or(FetchError::ToolMissing("yt-dlp"))?;
        let ffmpeg = platform::find_ffmpeg_binary().ok_or(FetchError::ToolMissing("ffmpeg"))?;
        Ok(Self::new(yt_dlp, ffmpeg))
    }
}

impl MediaFetcher for YtDlpFetcher {
    async fn fetch_audio(&self, item: &PlaylistItem, final_path: &Path) -> Result<(), FetchError> {
        let dest_dir = final_path
            .parent()
            .ok_or_else(|| FetchError::Extract("destination has no parent folder".to_string()))?;

        // Staged inside the destination folder so the final rename never
        // crosses a filesystem boundary.
        let staging = tempfile::Builder::new()
            .prefix(".juke-staging-")
            .tempdir_in(dest_dir)?;

        let url = format!("https://www.youtube.com/watch?v={}", item.video_id);
        let template = format!("{}/source.%(ext)s", staging.path().display());

        info!("fetching audio for {}", item.video_id);
        let output = Command::new(&self.yt_dlp)
            .arg("-f")
            .arg("bestaudio")
            .arg("--no-playlist")
            .arg("--no-progress")
            .arg("-o")
            .arg(&template)
            .arg(&url)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            for line in stderr.lines() {
                debug!("yt-dlp: {}", line);
            }
            if looks_like_no_audio(&stderr) {
                return Err(FetchError::NoAudio);
            }
            return Err(FetchError::Extract(last_line(&stderr)));
        }

        let source = find_staged_source(staging.path()).await?;
        let encoded = staging.path().join("encoded.mp3");

        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(&source)
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-q:a")
            .arg("2")
            .arg("-y")
            .arg(&encoded)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Encode(last_line(&stderr)));
        }

        tokio::fs::rename(&encoded, final_path).await?;
        debug!("encoded {}", final_path.display());
        Ok(())
        // `staging` drops here, removing the raw source (and, on any early
        // return above, whatever partial output was in flight).
    }
}

/// yt-dlp phrasings for "there is nothing to extract audio from".
fn looks_like_no_audio(stderr: &str) -> bool {
    let s = stderr.to_ascii_lowercase();
    s.contains("requested format is not available") || s.contains("no suitable formats")
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown error")
        .trim()
        .to_string()
}

async fn find_staged_source(staging: &Path) -> Result<PathBuf, FetchError> {
    let mut entries = tokio::fs::read_dir(staging).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if stem == "source" {
                return Ok(path);
            }
        }
    }
    Err(FetchError::Extract(
        "yt-dlp reported success but wrote no file".to_string(),
    ))
}
