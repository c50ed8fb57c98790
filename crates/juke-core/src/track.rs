use std::path::{Path, PathBuf};
use std::time::Duration;

/// One playable item. Identity is the absolute path; a `Track` is immutable
/// once created; the queue only ever moves it around.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    /// Known once probed from the file's metadata; `None` until then.
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(path: PathBuf, title: String, duration: Option<Duration>) -> Self {
        Self {
            path,
            title,
            duration,
        }
    }

    /// Build a track with a filename-derived title and no known duration.
    pub fn from_path(path: PathBuf) -> Self {
        let title = title_from_path(&path);
        Self {
            path,
            title,
            duration: None,
        }
    }
}

pub(crate) fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
