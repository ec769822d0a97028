use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Non-JSON response body (an HTML error page from a misconfigured
    /// proxy, usually); carries a truncated excerpt of the raw body.
    #[error("expected a JSON response, got: {0}")]
    UnexpectedPayload(String),
    /// JSON error response; the message is the payload's `detail`/`error`
    /// field verbatim, or an `HTTP <status>` fallback.
    #[error("{0}")]
    Api(String),
    #[error("another operation is already in progress")]
    ActionInProgress,
    #[error("no files selected for upload")]
    NoFilesSelected,
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
