//! Outgoing email.
//!
//! This crate provides:
//! - `EmailPayload` - Message to send
//! - `EmailProvider` - One delivery backend
//! - `ResendProvider` / `SmtpProvider` - The two production backends
//! - `Mailer` - Tries providers in order, stopping at the first success

mod error;
mod mailer;
mod payload;
mod provider;
mod resend;
mod smtp;

pub use error::*;
pub use mailer::*;
pub use payload::*;
pub use provider::*;
pub use resend::*;
pub use smtp::*;
