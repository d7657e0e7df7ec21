//! Outbound HTTP through the Spin host.

use async_trait::async_trait;
use mezze_middleware::IdentityError;
use mezze_site::{AuthRequest, AuthResponse, AuthTransport};

/// `AuthTransport` backed by `spin_sdk::http::send`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinAuthTransport;

fn spin_method(method: &http::Method) -> spin_sdk::http::Method {
    match *method {
        http::Method::GET => spin_sdk::http::Method::Get,
        http::Method::POST => spin_sdk::http::Method::Post,
        http::Method::PUT => spin_sdk::http::Method::Put,
        http::Method::DELETE => spin_sdk::http::Method::Delete,
        http::Method::PATCH => spin_sdk::http::Method::Patch,
        http::Method::HEAD => spin_sdk::http::Method::Head,
        http::Method::OPTIONS => spin_sdk::http::Method::Options,
        _ => spin_sdk::http::Method::Other(method.as_str().to_string()),
    }
}

#[async_trait(?Send)]
impl AuthTransport for SpinAuthTransport {
    async fn send(&self, request: AuthRequest) -> Result<AuthResponse, IdentityError> {
        let mut builder = spin_sdk::http::Request::builder();
        builder
            .method(spin_method(&request.method))
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder.header(name.as_str(), value.as_str());
        }
        let req = builder.body(request.body.unwrap_or_default()).build();

        let resp: spin_sdk::http::Response = spin_sdk::http::send(req)
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(AuthResponse {
            status: *resp.status(),
            body: resp.body().to_vec(),
        })
    }
}
