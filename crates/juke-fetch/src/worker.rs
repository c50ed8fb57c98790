//! One item's acquisition: existence check, fetch, outcome classification.
//!
//! Outcomes are data, not errors: a worker never aborts the batch it is
//! part of.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::api::PlaylistItem;
use crate::error::FetchError;
use crate::fetcher::MediaFetcher;

/// What happened to one playlist item.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
    Skipped { reason: String },
    Failed { error: String },
}

/// Make a title safe as a filename on every platform juke targets:
/// path separators, Windows-reserved punctuation, and control characters
/// become spaces; whitespace runs collapse; trailing dots go.
pub fn sanitize_title(title: &str) -> String {
    const INVALID: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let mapped: String = title
        .chars()
        .map(|c| {
            if INVALID.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    mapped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .trim()
        .to_string()
}

/// Deterministic output path for an item: `<folder>/<sanitized title>.mp3`,
/// falling back to the video id when nothing of the title survives.
pub fn output_path(folder: &Path, item: &PlaylistItem) -> PathBuf {
    let base = sanitize_title(&item.title);
    let base = if base.is_empty() {
        item.video_id.clone()
    } else {
        base
    };
    folder.join(format!("{base}.mp3"))
}

/// Acquire one item into `folder`. Re-running over an already-populated
/// folder is free: an existing output file short-circuits before any
/// network work.
pub async fn acquire_item<F: MediaFetcher>(
    fetcher: &F,
    folder: &Path,
    item: &PlaylistItem,
) -> AcquisitionResult {
    let path = output_path(folder, item);

    if path.exists() {
        debug!("already present, skipping download: {}", path.display());
        return AcquisitionResult::AlreadyPresent(path);
    }

    match fetcher.fetch_audio(item, &path).await {
        Ok(()) => {
            info!("downloaded: {}", path.display());
            AcquisitionResult::Downloaded(path)
        }
        Err(FetchError::NoAudio) => {
            info!("no audio track for {}, skipped", item.video_id);
            AcquisitionResult::Skipped {
                reason: "no audio track available".to_string(),
            }
        }
        Err(e) => {
            warn!("acquisition failed for {}: {}", item.video_id, e);
            AcquisitionResult::Failed {
                error: e.to_string(),
            }
        }
    }
}
