//! Middleware error types.

use thiserror::Error;

/// Failures reported by an identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider not configured: {0}")]
    NotConfigured(String),

    #[error("Identity request failed: {0}")]
    Transport(String),

    #[error("Identity provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("Malformed session: {0}")]
    MalformedSession(String),
}

impl IdentityError {
    /// Whether the failure came from the network or the provider rather than the request.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// Errors that abort middleware processing.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("Identity lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid response header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl MiddlewareError {
    /// HTTP status the platform should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Identity(_) => 503,
            Self::InvalidHeader { .. } => 500,
        }
    }
}
