//! Site error types.

use mezze_cache::CompressionError;
use mezze_middleware::MiddlewareError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    #[error("Failed to read asset {path}: {source}")]
    Asset {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compression(#[from] CompressionError),
}

impl SiteError {
    /// HTTP status to answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Middleware(e) => e.status_code(),
            Self::Asset { .. } | Self::Compression(_) => 500,
        }
    }
}
