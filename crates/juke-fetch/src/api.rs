//! Listing API client (YouTube Data API v3).
//!
//! Pagination is strictly sequential: each request carries the
//! continuation token from the previous response, and the sequence ends
//! when a response omits one.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ListingError;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The API refuses larger pages.
pub const MAX_PAGE_SIZE: u32 = 50;

/// One playlist entry as listed remotely. Exists only for the duration of
/// a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<ItemResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemResource {
    snippet: ItemSnippet,
}

#[derive(Debug, Deserialize)]
struct ItemSnippet {
    title: String,
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    items: Vec<PlaylistResource>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
}

/// A lazy, finite, forward-only source of playlist pages. The pipeline is
/// generic over this so tests can drive it without a network.
pub trait Listing: Send {
    /// The next page of items, `None` once the listing is exhausted.
    fn next_page(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<PlaylistItem>>, ListingError>> + Send;
}

/// Real paginator over the `playlistItems` endpoint.
pub struct PageIter {
    client: reqwest::Client,
    playlist_id: String,
    api_key: String,
    page_size: u32,
    /// Retries per page before giving up on the rest of the listing.
    retries: u32,
    next_token: Option<String>,
    done: bool,
}

impl PageIter {
    pub fn new(
        client: reqwest::Client,
        playlist_id: String,
        api_key: String,
        page_size: u32,
        retries: u32,
    ) -> Self {
        Self {
            client,
            playlist_id,
            api_key,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            retries,
            next_token: None,
            done: false,
        }
    }

    async fn fetch_page(&self) -> Result<PlaylistItemsResponse, ListingError> {
        let page_size = self.page_size.to_string();
        let mut req = self
            .client
            .get(format!("{API_BASE}/playlistItems"))
            .query(&[
                ("part", "snippet"),
                ("maxResults", page_size.as_str()),
                ("playlistId", self.playlist_id.as_str()),
                ("key", self.api_key.as_str()),
            ]);
        if let Some(token) = &self.next_token {
            req = req.query(&[("pageToken", token.as_str())]);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(ListingError::Status(response.status()));
        }

        response
            .json::<PlaylistItemsResponse>()
            .await
            .map_err(|e| ListingError::Malformed(e.to_string()))
    }
}

impl Listing for PageIter {
    async fn next_page(&mut self) -> Result<Option<Vec<PlaylistItem>>, ListingError> {
        if self.done {
            return Ok(None);
        }

        let mut attempt = 0;
        let page = loop {
            match self.fetch_page().await {
                Ok(page) => break page,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "listing page failed (attempt {}/{}): {}",
                        attempt, self.retries, e
                    );
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        };

        self.next_token = page.next_page_token;
        if self.next_token.is_none() {
            self.done = true;
        }

        let items: Vec<PlaylistItem> = page
            .items
            .into_iter()
            .map(|i| PlaylistItem {
                video_id: i.snippet.resource_id.video_id,
                title: i.snippet.title,
            })
            .collect();
        debug!(
            "listing page: {} items, more={}",
            items.len(),
            !self.done
        );
        Ok(Some(items))
    }
}

/// Look up the playlist's own title (for naming the destination folder).
pub async fn fetch_playlist_title(
    client: &reqwest::Client,
    api_key: &str,
    playlist_id: &str,
) -> Result<String, ListingError> {
    let response = client
        .get(format!("{API_BASE}/playlists"))
        .query(&[
            ("part", "snippet"),
            ("id", playlist_id),
            ("key", api_key),
        ])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ListingError::Status(response.status()));
    }

    let data: PlaylistsResponse = response
        .json()
        .await
        .map_err(|e| ListingError::Malformed(e.to_string()))?;

    Ok(data
        .items
        .into_iter()
        .next()
        .map(|p| p.snippet.title)
        .unwrap_or_else(|| "Unknown Playlist".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_playlist_items_page() {
        let body = r#"{
            "items": [
                {"snippet": {"title": "First Song", "resourceId": {"videoId": "abc123", "kind": "youtube#video"}}},
                {"snippet": {"title": "Second Song", "resourceId": {"videoId": "def456", "kind": "youtube#video"}}}
            ],
            "nextPageToken": "CAUQAA"
        }"#;
        let page: PlaylistItemsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].snippet.resource_id.video_id, "abc123");
        assert_eq!(page.items[1].snippet.title, "Second Song");
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn final_page_has_no_token() {
        let body = r#"{"items": []}"#;
        let page: PlaylistItemsResponse = serde_json::from_str(body).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn decodes_playlist_metadata() {
        let body = r#"{"items": [{"snippet": {"title": "road trip"}}]}"#;
        let data: PlaylistsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(data.items[0].snippet.title, "road trip");
    }

    #[test]
    fn page_size_is_clamped_to_api_limit() {
        let it = PageIter::new(
            reqwest::Client::new(),
            "PL123".into(),
            "key".into(),
            500,
            2,
        );
        assert_eq!(it.page_size, MAX_PAGE_SIZE);
    }
}
