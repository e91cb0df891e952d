//! Error types for lifesync.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while syncing feeds or reading the store.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not reach feed {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Feed {url} responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),

    #[error("ICS parse error: {0}")]
    Parse(String),

    #[error("Skipped event '{uid}': {reason}")]
    Component { uid: String, reason: String },

    #[error("Recurrence error for '{uid}': {reason}")]
    Expansion { uid: String, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Whether this error aborts a whole feed rather than a single event.
    pub fn is_feed_level(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. }
                | SyncError::HttpStatus { .. }
                | SyncError::Timeout(_)
                | SyncError::Parse(_)
                | SyncError::Io(_)
        )
    }
}

/// Result type alias for lifesync operations.
pub type SyncResult<T> = Result<T, SyncError>;
