//! Error types shared across the engine.
//!
//! Backend errors (redis, postgres) are flattened into string-carrying variants at
//! the connection boundary so the rest of the crate never depends on a driver.

use thiserror::Error;

/// Failures of the broadcast medium (cache + publish/subscribe).
#[derive(Debug, Error)]
pub enum MediumError {
    #[error("Failed to connect to broadcast medium: {0}")]
    ConnectionError(String),
    #[error("Broadcast medium command failed: {0}")]
    CommandError(String),
}

/// Failures of the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to connect to durable store: {0}")]
    ConnectionError(String),
    #[error("Query execution failed: {0}")]
    QueryError(String),
    #[error("Record is not a JSON object")]
    InvalidRecord,
}

/// Outcomes of the read path that are not a match.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The id is unknown to both the cache and the store.
    #[error("Match not found")]
    NotFound,
    #[error(transparent)]
    Medium(#[from] MediumError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to decode stored record: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why a chat message was refused. Sent back to the author only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChatRejection {
    #[error("Invalid message")]
    InvalidMessage,
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl ChatRejection {
    /// Stable machine-readable code, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            ChatRejection::InvalidMessage => "invalid_message",
            ChatRejection::RateLimited => "rate_limited",
        }
    }
}
