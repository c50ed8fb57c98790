//! Whole-playlist orchestration: sequential pagination feeding a bounded
//! pool of acquisition workers, with per-item outcomes aggregated in
//! listing order.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use juke_core::url::parse_playlist_url;
use juke_core::Config;

use crate::api::{self, Listing, PageIter, PlaylistItem};
use crate::error::AcquireError;
use crate::fetcher::{MediaFetcher, YtDlpFetcher};
use crate::worker::{self, AcquisitionResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub downloaded: usize,
    pub already_present: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: &AcquisitionResult) {
        match outcome {
            AcquisitionResult::Downloaded(_) => self.downloaded += 1,
            AcquisitionResult::AlreadyPresent(_) => self.already_present += 1,
            AcquisitionResult::Skipped { .. } => self.skipped += 1,
            AcquisitionResult::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.already_present + self.skipped + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} already present, {} skipped, {} failed",
            self.downloaded, self.already_present, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: PlaylistItem,
    pub outcome: AcquisitionResult,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Per-item outcomes in listing order.
    pub results: Vec<ItemReport>,
    pub summary: Summary,
    /// Set when pagination gave up mid-listing; the items already
    /// dispatched are still reported above, and the lost page counts as
    /// one failure in the summary.
    pub page_failure: Option<String>,
}

/// Drain `listing` into `folder` through at most `concurrency` workers.
///
/// Pagination is the backpressure point: a page is fetched only while the
/// worker pool has room for its items. Worker outcomes never abort the
/// run; a page-level listing failure (after the client's own retries)
/// aborts the remaining pages and reports partial results.
pub async fn acquire_into<L, F>(
    mut listing: L,
    fetcher: Arc<F>,
    folder: &Path,
    concurrency: usize,
) -> Result<PipelineReport, AcquireError>
where
    L: Listing,
    F: MediaFetcher,
{
    tokio::fs::create_dir_all(folder).await?;
    let concurrency = concurrency.max(1);

    let mut join_set: JoinSet<(usize, PlaylistItem, AcquisitionResult)> = JoinSet::new();
    let mut slots: Vec<Option<ItemReport>> = Vec::new();
    let mut page_failure = None;

    loop {
        match listing.next_page().await {
            Ok(Some(items)) => {
                for item in items {
                    // Wait for pool room before dispatching (and before
                    // fetching any further pages).
                    while join_set.len() >= concurrency {
                        if let Some(joined) = join_set.join_next().await {
                            settle(&mut slots, joined);
                        }
                    }

                    let index = slots.len();
                    slots.push(None);
                    let fetcher = fetcher.clone();
                    let folder = folder.to_path_buf();
                    join_set.spawn(async move {
                        let outcome = worker::acquire_item(fetcher.as_ref(), &folder, &item).await;
                        (index, item, outcome)
                    });
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("pagination aborted, reporting partial results: {}", e);
                page_failure = Some(e.to_string());
                break;
            }
        }
    }

    while let Some(joined) = join_set.join_next().await {
        settle(&mut slots, joined);
    }

    let results: Vec<ItemReport> = slots.into_iter().flatten().collect();
    let mut summary = Summary::default();
    for report in &results {
        summary.record(&report.outcome);
    }
    if page_failure.is_some() {
        summary.failed += 1;
    }

    info!("acquisition finished: {}", summary);
    Ok(PipelineReport {
        results,
        summary,
        page_failure,
    })
}

fn settle(
    slots: &mut [Option<ItemReport>],
    joined: Result<(usize, PlaylistItem, AcquisitionResult), tokio::task::JoinError>,
) {
    match joined {
        Ok((index, item, outcome)) => {
            slots[index] = Some(ItemReport { item, outcome });
        }
        Err(e) => warn!("acquisition worker task failed: {}", e),
    }
}

/// Acquire a whole playlist from its URL into the configured playlists
/// root, using the production listing client and fetcher.
pub async fn acquire_playlist(config: &Config, url: &str) -> Result<PipelineReport, AcquireError> {
    let playlist_id =
        parse_playlist_url(url).map_err(|e| AcquireError::InvalidUrl(e.to_string()))?;
    let api_key = config.api_key().ok_or(AcquireError::MissingApiKey)?;

    let client = reqwest::Client::new();
    let title = api::fetch_playlist_title(&client, &api_key, &playlist_id).await?;

    let folder_name = worker::sanitize_title(&title);
    let folder_name = if folder_name.is_empty() {
        playlist_id.clone()
    } else {
        folder_name
    };
    let folder = config.paths.playlists_dir.join(folder_name);
    info!("acquiring playlist '{}' into {}", title, folder.display());

    let listing = PageIter::new(
        client,
        playlist_id,
        api_key,
        config.api.page_size,
        config.acquire.page_retries,
    );
    let fetcher =
        Arc::new(YtDlpFetcher::discover().map_err(|e| AcquireError::ToolMissing(e.to_string()))?);

    acquire_into(listing, fetcher, &folder, config.acquire.concurrency).await
}
