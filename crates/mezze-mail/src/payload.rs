//! Email payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Message handed to the mailer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub to: Vec<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extra message headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Overrides the provider's configured sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl EmailPayload {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sender to use given a provider default.
    pub fn sender<'a>(&'a self, default: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(default)
    }

    /// Reject payloads no provider could deliver.
    pub fn validate(&self) -> Result<(), MailError> {
        if self.to.is_empty() {
            return Err(MailError::InvalidPayload("no recipients".to_string()));
        }
        if let Some(bad) = self.to.iter().find(|addr| !addr.contains('@')) {
            return Err(MailError::InvalidPayload(format!("invalid recipient '{}'", bad)));
        }
        if self.subject.trim().is_empty() {
            return Err(MailError::InvalidPayload("empty subject".to_string()));
        }
        if self.html.is_none() && self.text.is_none() {
            return Err(MailError::InvalidPayload("no html or text body".to_string()));
        }
        Ok(())
    }
}
