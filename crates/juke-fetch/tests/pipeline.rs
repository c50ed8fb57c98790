//! End-to-end pipeline tests against a scripted listing and fetcher:
//! no network, no external binaries.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use juke_fetch::{
    acquire_into, AcquisitionResult, FetchError, Listing, ListingError, MediaFetcher,
    PlaylistItem,
};

/// `RUST_LOG=debug cargo test -p juke-fetch` shows the pipeline logs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn item(id: &str, title: &str) -> PlaylistItem {
    PlaylistItem {
        video_id: id.into(),
        title: title.into(),
    }
}

/// Pages served in order; an `Err` page simulates a listing failure after
/// the client's own retries were exhausted.
struct ScriptedListing {
    pages: VecDeque<Result<Vec<PlaylistItem>, String>>,
}

impl ScriptedListing {
    fn new(pages: Vec<Result<Vec<PlaylistItem>, String>>) -> Self {
        Self {
            pages: pages.into(),
        }
    }
}

impl Listing for ScriptedListing {
    async fn next_page(&mut self) -> Result<Option<Vec<PlaylistItem>>, ListingError> {
        match self.pages.pop_front() {
            None => Ok(None),
            Some(Ok(items)) => Ok(Some(items)),
            Some(Err(msg)) => Err(ListingError::Malformed(msg)),
        }
    }
}

/// Fetcher scripted by video-id prefix: `bad*` fails, `noaudio*` has no
/// audio track, anything else writes the output file.
struct ScriptedFetcher {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl MediaFetcher for ScriptedFetcher {
    async fn fetch_audio(
        &self,
        item: &PlaylistItem,
        final_path: &Path,
    ) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Hold the slot long enough for overlap to be observable.
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if item.video_id.starts_with("bad") {
            return Err(FetchError::Extract("simulated extractor failure".into()));
        }
        if item.video_id.starts_with("noaudio") {
            return Err(FetchError::NoAudio);
        }
        tokio::fs::write(final_path, b"mp3 bytes").await?;
        Ok(())
    }
}

fn mp3_count(folder: &Path) -> usize {
    std::fs::read_dir(folder)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| {
                    e.path()
                        .extension()
                        .map(|x| x == "mp3")
                        .unwrap_or(false)
                })
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn one_bad_item_does_not_abort_the_batch() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("mix");

    let listing = ScriptedListing::new(vec![Ok(vec![
        item("ok1", "First"),
        item("bad2", "Second"),
        item("ok3", "Third"),
    ])]);

    let report = acquire_into(listing, Arc::new(ScriptedFetcher::new()), &folder, 4)
        .await
        .unwrap();

    assert_eq!(report.summary.downloaded, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 0);
    assert!(report.page_failure.is_none());

    assert!(folder.join("First.mp3").exists());
    assert!(!folder.join("Second.mp3").exists());
    assert!(folder.join("Third.mp3").exists());

    // Outcomes come back in listing order.
    let ids: Vec<&str> = report
        .results
        .iter()
        .map(|r| r.item.video_id.as_str())
        .collect();
    assert_eq!(ids, vec!["ok1", "bad2", "ok3"]);
    assert!(matches!(
        report.results[1].outcome,
        AcquisitionResult::Failed { .. }
    ));
}

#[tokio::test]
async fn second_run_is_entirely_deduplicated() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("mix");

    let pages = || {
        ScriptedListing::new(vec![Ok(vec![
            item("ok1", "Alpha"),
            item("ok2", "Beta"),
            item("ok3", "Gamma"),
        ])])
    };

    let fetcher = Arc::new(ScriptedFetcher::new());
    let first = acquire_into(pages(), fetcher.clone(), &folder, 4)
        .await
        .unwrap();
    assert_eq!(first.summary.downloaded, 3);
    let files_after_first = mp3_count(&folder);
    let calls_after_first = fetcher.calls.load(Ordering::SeqCst);

    let second = acquire_into(pages(), fetcher.clone(), &folder, 4)
        .await
        .unwrap();
    assert_eq!(second.summary.already_present, 3);
    assert_eq!(second.summary.downloaded, 0);

    // Nothing new written, nothing re-fetched.
    assert_eq!(mp3_count(&folder), files_after_first);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn page_failure_reports_partial_results() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("mix");

    let listing = ScriptedListing::new(vec![
        Ok(vec![item("ok1", "One"), item("ok2", "Two")]),
        Err("listing went away".to_string()),
        // Never reached.
        Ok(vec![item("ok9", "Ghost")]),
    ]);

    let report = acquire_into(listing, Arc::new(ScriptedFetcher::new()), &folder, 2)
        .await
        .unwrap();

    assert_eq!(report.summary.downloaded, 2);
    // The lost page counts as one failure.
    assert_eq!(report.summary.failed, 1);
    assert!(report
        .page_failure
        .as_deref()
        .unwrap()
        .contains("listing went away"));
    assert_eq!(report.results.len(), 2);
    assert!(!folder.join("Ghost.mp3").exists());
}

#[tokio::test]
async fn worker_pool_is_bounded() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("mix");

    let items: Vec<PlaylistItem> = (0..10)
        .map(|i| item(&format!("ok{i}"), &format!("Track {i}")))
        .collect();
    let listing = ScriptedListing::new(vec![Ok(items)]);

    let fetcher = Arc::new(ScriptedFetcher::new());
    let report = acquire_into(listing, fetcher.clone(), &folder, 3)
        .await
        .unwrap();

    assert_eq!(report.summary.downloaded, 10);
    assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn destination_folder_creation_is_idempotent() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("nested").join("mix");

    let run = |listing| acquire_into(listing, Arc::new(ScriptedFetcher::new()), &folder, 1);

    run(ScriptedListing::new(vec![Ok(vec![item("ok1", "Solo")])]))
        .await
        .unwrap();
    // Second run against the existing folder must not error.
    let report = run(ScriptedListing::new(vec![Ok(vec![item("ok1", "Solo")])]))
        .await
        .unwrap();
    assert_eq!(report.summary.already_present, 1);
}

#[tokio::test]
async fn results_spanning_pages_keep_listing_order() {
    init_tracing();
    let root = TempDir::new().unwrap();
    let folder = root.path().join("mix");

    let listing = ScriptedListing::new(vec![
        Ok(vec![item("ok0", "A"), item("ok1", "B")]),
        Ok(vec![item("noaudio2", "C"), item("ok3", "D")]),
    ]);

    let report = acquire_into(listing, Arc::new(ScriptedFetcher::new()), &folder, 4)
        .await
        .unwrap();

    let ids: Vec<&str> = report
        .results
        .iter()
        .map(|r| r.item.video_id.as_str())
        .collect();
    assert_eq!(ids, vec!["ok0", "ok1", "noaudio2", "ok3"]);
    assert_eq!(report.summary.downloaded, 3);
    assert_eq!(report.summary.skipped, 1);
}
