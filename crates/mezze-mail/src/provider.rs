//! Provider contract.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::payload::EmailPayload;

/// Successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub provider: &'static str,
    /// Provider message ID, when the provider returns one.
    pub id: Option<String>,
}

/// An email delivery backend.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn send(&self, payload: &EmailPayload) -> Result<SendReceipt, ProviderError>;
}
