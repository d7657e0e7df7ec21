//! Resend HTTP API provider.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mezze_core::ResendConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::payload::EmailPayload;
use crate::provider::{EmailProvider, SendReceipt};

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

const PROVIDER: &str = "resend";

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: Option<String>,
}

/// Sends through the Resend REST API.
pub struct ResendProvider {
    api_key: String,
    from_email: String,
    endpoint: String,
    client: Client,
}

impl ResendProvider {
    pub fn new(config: &ResendConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            endpoint: RESEND_API_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request<'a>(&'a self, payload: &'a EmailPayload) -> ResendRequest<'a> {
        ResendRequest {
            from: payload.sender(&self.from_email),
            to: &payload.to,
            subject: &payload.subject,
            html: payload.html.as_deref(),
            text: payload.text.as_deref(),
            headers: (!payload.headers.is_empty()).then_some(&payload.headers),
        }
    }
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendReceipt, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(payload))
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ResendErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Failed to send email via Resend".to_string());
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
                message,
            });
        }

        let id = response
            .json::<ResendResponse>()
            .await
            .ok()
            .and_then(|body| body.id);
        Ok(SendReceipt {
            provider: PROVIDER,
            id,
        })
    }
}
