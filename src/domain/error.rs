//! Domain error types

use thiserror::Error;

/// Errors that can occur while synchronizing a sample stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Result type alias for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
