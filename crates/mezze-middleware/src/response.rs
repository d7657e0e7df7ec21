//! Middleware output.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use mezze_cache::{header_names, ContentEncoding, HeaderSet};
use mezze_core::RequestPhase;

use crate::error::MiddlewareError;
use crate::identity::User;

/// What the platform should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareOutcome {
    /// Continue to the route handler with the accumulated headers.
    Next,
    /// Answer with a temporary redirect.
    Redirect { location: String },
}

/// Headers and decision produced for one request.
#[derive(Debug, Clone)]
pub struct MiddlewareResponse {
    pub outcome: MiddlewareOutcome,
    /// Headers to put on the final response, `Set-Cookie` first.
    pub headers: HeaderSet,
    /// Last phase completed.
    pub phase: RequestPhase,
    /// Encoding negotiated from Accept-Encoding (identity on redirects).
    pub encoding: ContentEncoding,
    /// User resolved in the auth phase.
    pub user: Option<User>,
}

impl MiddlewareResponse {
    pub(crate) fn next(
        headers: HeaderSet,
        encoding: ContentEncoding,
        user: Option<User>,
    ) -> Self {
        Self {
            outcome: MiddlewareOutcome::Next,
            headers,
            phase: RequestPhase::Done,
            encoding,
            user,
        }
    }

    pub(crate) fn redirect(location: &str, mut headers: HeaderSet, user: Option<User>) -> Self {
        headers.set(header_names::LOCATION, location);
        Self {
            outcome: MiddlewareOutcome::Redirect {
                location: location.to_string(),
            },
            headers,
            phase: RequestPhase::AuthRefreshed,
            encoding: ContentEncoding::Identity,
            user,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.outcome, MiddlewareOutcome::Redirect { .. })
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        match &self.outcome {
            MiddlewareOutcome::Redirect { location } => Some(location),
            MiddlewareOutcome::Next => None,
        }
    }

    /// `307` for redirects, `200` otherwise.
    pub fn status(&self) -> StatusCode {
        if self.is_redirect() {
            StatusCode::TEMPORARY_REDIRECT
        } else {
            StatusCode::OK
        }
    }

    /// Copy the headers onto an existing header map.
    ///
    /// `Set-Cookie` values are appended; every other header replaces what is there.
    pub fn apply_to(&self, target: &mut HeaderMap) -> Result<(), MiddlewareError> {
        for (name, value) in self.headers.iter() {
            let (name, value) = parse_header(name, value)?;
            if name == http::header::SET_COOKIE {
                target.append(name, value);
            } else {
                target.insert(name, value);
            }
        }
        Ok(())
    }

    /// Build an `http::Response` carrying the status and headers.
    pub fn to_http_response<B>(&self, body: B) -> Result<http::Response<B>, MiddlewareError> {
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status();
        self.apply_to(response.headers_mut())?;
        Ok(response)
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), MiddlewareError> {
    let invalid = |reason: String| MiddlewareError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}
