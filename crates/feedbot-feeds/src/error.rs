use thiserror::Error;

/// Errors surfaced by feed, subscription and persistence operations.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed could not be downloaded or parsed.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No matching subscription found")]
    NotFound,

    /// Storage read/write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("state encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The delivery queue is gone.
    #[error("transport error: {0}")]
    Transport(String),
}

impl FeedError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        FeedError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
