//! Error taxonomy for the alignment core

use thiserror::Error;

/// Errors raised by the alignment core.
///
/// Degenerate but valid inputs (zero-length segments, empty masks, a search
/// window that collapses to one candidate) never produce an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Malformed configuration, rejected before any numeric work
    #[error("configuration error: {0}")]
    Config(String),
    /// Array or matrix does not match the expected grid dimensions
    #[error("shape error: {0}")]
    Shape(String),
}

impl SyncError {
    pub fn config(msg: impl Into<String>) -> Self {
        SyncError::Config(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        SyncError::Shape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
