//! Stream client errors.

use thiserror::Error;

/// Stream client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("no active log stream")]
    NotAttached,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Stream client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
