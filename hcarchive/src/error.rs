use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single request against the HipChat API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or rejected auth token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server answered 429. Handled by the retry wrapper unless a retry
    /// ceiling is configured.
    #[error("rate-limited by the HipChat API")]
    RateLimited,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Errors that make every further request pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

/// Failure while writing or reading the archive file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("cannot move archive into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Failure while building or querying the search index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    #[error("invalid query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("{} already holds files, pick a new index directory", .0.display())]
    Exists(PathBuf),

    #[error("indexing conversation {partner} failed: {reason}")]
    Build { partner: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
