//! Ordered provider fallback.

use mezze_core::MailConfig;

use crate::error::MailError;
use crate::payload::EmailPayload;
use crate::provider::{EmailProvider, SendReceipt};
use crate::resend::ResendProvider;
use crate::smtp::SmtpProvider;

/// Sends through the first provider that succeeds.
#[derive(Default)]
pub struct Mailer {
    providers: Vec<Box<dyn EmailProvider>>,
}

impl Mailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resend first, then SMTP, each only when its credential is present.
    pub fn from_config(config: &MailConfig) -> Self {
        let mut mailer = Self::new();
        if let Some(resend) = config.resend.as_ref().filter(|r| !r.api_key.is_empty()) {
            mailer = mailer.with_provider(ResendProvider::new(resend));
        }
        if let Some(smtp) = config.smtp.as_ref().filter(|s| !s.pass.is_empty()) {
            mailer = mailer.with_provider(SmtpProvider::new(smtp));
        }
        mailer
    }

    /// Append a provider; providers are tried in insertion order.
    pub fn with_provider(mut self, provider: impl EmailProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    pub async fn send(&self, payload: &EmailPayload) -> Result<SendReceipt, MailError> {
        payload.validate()?;
        if self.providers.is_empty() {
            return Err(MailError::NoProviderConfigured);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.send(payload).await {
                Ok(receipt) => {
                    tracing::info!(provider = receipt.provider, recipients = payload.to.len(), "email sent");
                    return Ok(receipt);
                }
                Err(err) => {
                    tracing::warn!(provider = provider.name(), error = %err, "email provider failed");
                    failures.push(err);
                }
            }
        }
        Err(MailError::AllProvidersFailed(failures))
    }
}
