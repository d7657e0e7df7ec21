//! Mail error types.

use thiserror::Error;

/// Failure of a single provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider}: request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: rejected with status {status}: {message}")]
    Rejected {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider}: could not build message: {message}")]
    InvalidMessage {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Request { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::InvalidMessage { provider, .. } => provider,
        }
    }
}

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("No email provider configured. Set RESEND_API_KEY or SMTP_* environment variables.")]
    NoProviderConfigured,

    /// Every provider was tried; errors are in attempt order.
    #[error("all email providers failed: {}", join_errors(.0))]
    AllProvidersFailed(Vec<ProviderError>),

    #[error("invalid email payload: {0}")]
    InvalidPayload(String),
}

fn join_errors(errors: &[ProviderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
