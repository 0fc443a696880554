// SPDX-License-Identifier: MIT

//! Engine error types.
//!
//! The engine is called by transport layers that map these onto their own
//! response formats, so nothing here knows about HTTP.

/// Engine error type surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
