//! Cache error types.

use thiserror::Error;

/// Errors raised while building a policy table.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid pattern for rule {priority}: {source}")]
    InvalidPattern {
        priority: u32,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate rule priority {0}")]
    DuplicatePriority(u32),

    #[error("Invalid tag header on rule {priority}: {name}")]
    InvalidTag { priority: u32, name: String },
}

/// Errors raised while compressing a body.
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Compression failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
