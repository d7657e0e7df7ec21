//! SMTP provider.

use async_trait::async_trait;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mezze_core::SmtpConfig;

use crate::error::ProviderError;
use crate::payload::EmailPayload;
use crate::provider::{EmailProvider, SendReceipt};

const PROVIDER: &str = "smtp";

fn invalid(message: impl ToString) -> ProviderError {
    ProviderError::InvalidMessage {
        provider: PROVIDER,
        message: message.to_string(),
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ProviderError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| invalid(format!("'{}': {}", address, e)))
}

/// Sends through an authenticated SMTP relay.
///
/// `secure` selects implicit TLS (usually port 465); otherwise STARTTLS is
/// negotiated.
pub struct SmtpProvider {
    config: SmtpConfig,
}

impl SmtpProvider {
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn build_message(&self, payload: &EmailPayload) -> Result<Message, ProviderError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(payload.sender(&self.config.from_email))?)
            .subject(payload.subject.as_str());
        for to in &payload.to {
            builder = builder.to(parse_mailbox(to)?);
        }
        for (name, value) in &payload.headers {
            let name = HeaderName::new_from_ascii(name.clone()).map_err(invalid)?;
            builder = builder.raw_header(HeaderValue::new(name, value.clone()));
        }

        let built = match (&payload.text, &payload.html) {
            (Some(text), Some(html)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
            (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
            (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text.clone()),
            (None, None) => return Err(invalid("no html or text body")),
        };
        built.map_err(invalid)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ProviderError> {
        let builder = if self.config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
        }
        .map_err(|e| ProviderError::Request {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        Ok(builder
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.user.clone(),
                self.config.pass.clone(),
            ))
            .build())
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendReceipt, ProviderError> {
        let message = self.build_message(payload)?;
        // lettre maps negative SMTP replies to errors.
        self.transport()?
            .send(message)
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(SendReceipt {
            provider: PROVIDER,
            id: None,
        })
    }
}
