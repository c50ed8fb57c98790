//! The play queue: a canonical (acquisition) order that is only ever
//! appended to, an active order that playback walks, and a cursor into the
//! active order. Shuffle permutes the active order only.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use juke_core::Track;

use crate::error::PlayerError;

#[derive(Debug, Default)]
pub struct Queue {
    canonical: Vec<Track>,
    active: Vec<Track>,
    cursor: Option<usize>,
    shuffled: bool,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The track under the cursor, if any.
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.active.get(i))
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.active.iter().position(|t| t.path == path)
    }

    /// Append tracks to both orders, preserving their relative order and
    /// skipping any whose path is already queued. Returns how many were
    /// actually added.
    pub fn append(&mut self, tracks: Vec<Track>) -> usize {
        let mut added = 0;
        for track in tracks {
            if self.canonical.iter().any(|t| t.path == track.path) {
                debug!("already queued, skipping: {}", track.path.display());
                continue;
            }
            self.canonical.push(track.clone());
            self.active.push(track);
            added += 1;
        }
        added
    }

    /// Replace the whole queue (e.g. after re-enumerating a playlist
    /// folder). Resets shuffle and cursor.
    pub fn reload(&mut self, tracks: Vec<Track>) {
        self.canonical = tracks.clone();
        self.active = tracks;
        self.cursor = None;
        self.shuffled = false;
    }

    /// Move the cursor one step forward, wrapping past the end; the queue
    /// is logically circular. A fresh (unset) cursor lands on 0.
    pub fn advance(&mut self) -> Result<usize, PlayerError> {
        if self.active.is_empty() {
            return Err(PlayerError::EmptyQueue);
        }
        let next = match self.cursor {
            Some(i) => (i + 1) % self.active.len(),
            None => 0,
        };
        self.cursor = Some(next);
        Ok(next)
    }

    /// Ensure the cursor points somewhere, defaulting to the first track.
    pub fn ensure_cursor(&mut self) -> Result<usize, PlayerError> {
        if self.active.is_empty() {
            return Err(PlayerError::EmptyQueue);
        }
        let i = self.cursor.unwrap_or(0);
        self.cursor = Some(i);
        Ok(i)
    }

    /// Fisher-Yates permutation of the active order. The canonical order is
    /// untouched and the cursor follows the previously-current track to its
    /// new position.
    pub fn enable_shuffle<R: Rng>(&mut self, rng: &mut R) {
        let current = self.current().map(|t| t.path.clone());
        self.active.shuffle(rng);
        self.shuffled = true;
        self.relocate_cursor(current);
    }

    /// Restore the canonical order. The cursor follows the
    /// previously-current track, falling back to 0 when it is gone (e.g.
    /// after a reload).
    pub fn disable_shuffle(&mut self) {
        let current = self.current().map(|t| t.path.clone());
        self.active = self.canonical.clone();
        self.shuffled = false;
        self.relocate_cursor(current);
    }

    fn relocate_cursor(&mut self, current: Option<std::path::PathBuf>) {
        if self.active.is_empty() {
            self.cursor = None;
            return;
        }
        if self.cursor.is_none() {
            return;
        }
        self.cursor = Some(
            current
                .and_then(|p| self.position_of(&p))
                .unwrap_or(0),
        );
    }

    /// Active-order snapshot for display layers.
    pub fn tracks(&self) -> &[Track] {
        &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn track(name: &str) -> Track {
        Track::from_path(PathBuf::from(format!("/music/{name}.mp3")))
    }

    fn queue_of(n: usize) -> Queue {
        let mut q = Queue::new();
        q.append((0..n).map(|i| track(&format!("t{i}"))).collect());
        q
    }

    #[test]
    fn advance_is_circular_and_complete() {
        let mut q = queue_of(3);
        q.ensure_cursor().unwrap();
        let mut visited = vec![q.cursor().unwrap()];
        for _ in 0..6 {
            visited.push(q.advance().unwrap());
        }
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn advance_on_empty_queue_fails() {
        let mut q = Queue::new();
        assert!(matches!(q.advance(), Err(PlayerError::EmptyQueue)));
    }

    #[test]
    fn append_dedupes_by_path() {
        let mut q = queue_of(2);
        let added = q.append(vec![track("t1"), track("t9")]);
        assert_eq!(added, 1);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn shuffle_roundtrip_restores_canonical_order() {
        let mut q = queue_of(8);
        q.ensure_cursor().unwrap();
        let before: Vec<_> = q.tracks().to_vec();

        let mut rng = rand::thread_rng();
        q.enable_shuffle(&mut rng);
        assert!(q.is_shuffled());
        q.disable_shuffle();

        assert!(!q.is_shuffled());
        assert_eq!(q.tracks(), before.as_slice());
    }

    #[test]
    fn shuffle_preserves_current_track_identity() {
        let mut q = queue_of(8);
        q.ensure_cursor().unwrap();
        for _ in 0..3 {
            q.advance().unwrap();
        }
        let current = q.current().unwrap().path.clone();

        let mut rng = rand::thread_rng();
        q.enable_shuffle(&mut rng);
        assert_eq!(q.current().unwrap().path, current);

        q.disable_shuffle();
        assert_eq!(q.current().unwrap().path, current);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut q = queue_of(16);
        q.ensure_cursor().unwrap();
        let mut before: Vec<_> = q.tracks().iter().map(|t| t.path.clone()).collect();

        let mut rng = rand::thread_rng();
        q.enable_shuffle(&mut rng);
        let mut after: Vec<_> = q.tracks().iter().map(|t| t.path.clone()).collect();

        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn reload_replaces_wholesale_and_resets_position() {
        let mut q = queue_of(4);
        q.ensure_cursor().unwrap();
        let mut rng = rand::thread_rng();
        q.enable_shuffle(&mut rng);

        q.reload(vec![track("x0"), track("x1")]);
        assert_eq!(q.len(), 2);
        assert!(!q.is_shuffled());
        assert_eq!(q.cursor(), None);
        assert_eq!(q.ensure_cursor().unwrap(), 0);
    }
}
