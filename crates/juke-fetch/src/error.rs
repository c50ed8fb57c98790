use thiserror::Error;

/// A listing page could not be fetched or understood. Fails that page;
/// the pipeline decides what happens to the rest of the run.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing API transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("listing API returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed listing page: {0}")]
    Malformed(String),
}

/// Per-item fetch-and-encode failure. Never propagates past the worker;
/// it becomes data in the aggregated result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no audio track available")]
    NoAudio,

    #[error("audio extraction failed: {0}")]
    Extract(String),

    #[error("audio encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0} binary not found")]
    ToolMissing(&'static str),
}

/// Pipeline-level failure that prevents a run from starting or creating
/// its destination.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("not a playlist URL: {0}")]
    InvalidUrl(String),

    #[error("no listing API key configured (set YOUTUBE_API_KEY or [api] key)")]
    MissingApiKey,

    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("required tool missing: {0}")]
    ToolMissing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
