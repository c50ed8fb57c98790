//! Playlist acquisition: paginate a remote listing API, then download and
//! encode each item into a local playlist folder, with existence-based
//! deduplication and per-item failure isolation.

pub mod api;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod worker;

pub use api::{Listing, PageIter, PlaylistItem};
pub use error::{AcquireError, FetchError, ListingError};
pub use fetcher::{MediaFetcher, YtDlpFetcher};
pub use pipeline::{acquire_into, acquire_playlist, ItemReport, PipelineReport, Summary};
pub use worker::AcquisitionResult;
