//! On-disk playlist enumeration.
//!
//! A playlists root holds one subfolder per playlist; each subfolder holds
//! the acquired `.mp3` files. Listing order is sorted by name so queue
//! population is reproducible across runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::{debug, warn};

use crate::track::{title_from_path, Track};

/// List candidate playlist folders under `root` as
/// `(display_name, absolute_path)` pairs.
pub fn list_playlists(root: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(root) {
        Ok(e) => e,
        Err(e) => {
            warn!("cannot read playlists root {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut playlists: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_string();
            if name.trim().is_empty() || name.starts_with('.') {
                return None;
            }
            Some((name, e.path()))
        })
        .collect();

    playlists.sort_by(|a, b| a.0.cmp(&b.0));
    playlists
}

/// List the playable tracks in one playlist folder, probing each file's
/// metadata for a tagged title and duration. Probe failures degrade to a
/// filename-derived title and never abort the listing.
pub fn list_tracks(folder: &Path) -> Vec<Track> {
    let entries = match std::fs::read_dir(folder) {
        Ok(e) => e,
        Err(e) => {
            warn!("cannot read playlist folder {}: {}", folder.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, "mp3"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let (title, duration) = probe_file(&path).unwrap_or_else(|e| {
                debug!("metadata probe failed for {}: {}", path.display(), e);
                (None, None)
            });
            let title = title.unwrap_or_else(|| title_from_path(&path));
            Track::new(path, title, duration)
        })
        .collect()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn probe_file(path: &Path) -> anyhow::Result<(Option<String>, Option<Duration>)> {
    let tagged = Probe::open(path)?.read()?;
    let duration = tagged.properties().duration();
    let title = tagged
        .primary_tag()
        .and_then(|tag| tag.title().map(|t| t.to_string()))
        .filter(|t| !t.trim().is_empty());
    let duration = if duration.is_zero() {
        None
    } else {
        Some(duration)
    };
    Ok((title, duration))
}
