//! Supabase Auth identity backend.
//!
//! The browser session lives in the `sb-<project>-auth-token` cookie as JSON,
//! optionally `base64-` prefixed and split across `.0`, `.1`, ... chunks when
//! large. The access token is validated against `/auth/v1/user`; an expired
//! token is exchanged through the refresh grant and the rotated session is
//! written back as a cookie mutation.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use http::Method;
use mezze_core::IdentityConfig;
use mezze_middleware::{
    CookieMutation, CookieOptions, IdentityError, IdentityLookup, IdentityProvider, SameSite, User,
};
use serde::{Deserialize, Serialize};

/// Lifetime of the session cookie (400 days).
pub const SESSION_COOKIE_MAX_AGE: i64 = 400 * 24 * 60 * 60;

/// Largest value written to a single session cookie; longer sessions are
/// split across `.0`, `.1`, ... chunks.
pub const MAX_CHUNK_SIZE: usize = 3180;

const BASE64_PREFIX: &str = "base64-";

/// Outbound request to the auth server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Auth server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP client used to reach the auth server.
#[async_trait(?Send)]
pub trait AuthTransport {
    async fn send(&self, request: AuthRequest) -> Result<AuthResponse, IdentityError>;
}

/// Session stored in the auth cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
}

/// User object returned by the auth server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl From<AuthUser> for User {
    fn from(user: AuthUser) -> Self {
        User {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Project reference: the first host label of the project URL.
pub fn project_ref(url: &str) -> Option<&str> {
    let host = url.split("://").nth(1).unwrap_or(url);
    let host = host.split(['/', ':']).next()?;
    host.split('.').next().filter(|label| !label.is_empty())
}

/// Decode a cookie value into a session.
pub fn decode_session(value: &str) -> Result<StoredSession, IdentityError> {
    let json = match value.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .or_else(|_| STANDARD.decode(encoded))
                .map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| IdentityError::MalformedSession(e.to_string()))?
        }
        None => value.to_string(),
    };
    serde_json::from_str(&json).map_err(|e| IdentityError::MalformedSession(e.to_string()))
}

/// Encode a session as a `base64-` cookie value.
pub fn encode_session(session: &StoredSession) -> Result<String, IdentityError> {
    let json =
        serde_json::to_vec(session).map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
    Ok(format!("{}{}", BASE64_PREFIX, URL_SAFE_NO_PAD.encode(json)))
}

/// Identity provider backed by Supabase Auth.
pub struct SupabaseIdentity<T> {
    base_url: String,
    anon_key: String,
    cookie_name: String,
    transport: T,
}

impl<T: AuthTransport> SupabaseIdentity<T> {
    pub fn new(config: &IdentityConfig, transport: T) -> Result<Self, IdentityError> {
        config
            .check()
            .map_err(|issue| IdentityError::NotConfigured(issue.to_string()))?;
        let (Some(url), Some(anon_key)) = (&config.url, &config.anon_key) else {
            return Err(IdentityError::NotConfigured("identity settings missing".to_string()));
        };
        let project = project_ref(url)
            .ok_or_else(|| IdentityError::NotConfigured(format!("cannot derive project from {}", url)))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.clone(),
            cookie_name: format!("sb-{}-auth-token", project),
            transport,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session cookie value, joining chunked cookies when needed.
    fn session_cookie(&self, cookies: &[(String, String)]) -> Option<String> {
        let find = |name: &str| {
            cookies
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };

        if let Some(value) = find(&self.cookie_name) {
            return Some(value.to_string());
        }

        let mut joined = String::new();
        for index in 0.. {
            match find(&format!("{}.{}", self.cookie_name, index)) {
                Some(chunk) => joined.push_str(chunk),
                None => break,
            }
        }
        (!joined.is_empty()).then_some(joined)
    }

    fn session_options(&self) -> CookieOptions {
        CookieOptions {
            path: Some("/".to_string()),
            max_age: Some(SESSION_COOKIE_MAX_AGE),
            secure: self.base_url.starts_with("https://"),
            same_site: Some(SameSite::Lax),
            ..Default::default()
        }
    }

    /// Request cookies that are chunks of the session cookie, with their index.
    fn chunk_cookies<'a>(
        &'a self,
        cookies: &'a [(String, String)],
    ) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        let chunk_prefix = format!("{}.", self.cookie_name);
        cookies.iter().filter_map(move |(name, _)| {
            let index = name.strip_prefix(&chunk_prefix)?.parse::<usize>().ok()?;
            Some((index, name.as_str()))
        })
    }

    /// Sign out: remove the session cookie and any chunks of it.
    fn clear_session(&self, cookies: &[(String, String)]) -> IdentityLookup {
        let mut lookup =
            IdentityLookup::anonymous().with_mutation(CookieMutation::remove(self.cookie_name.clone()));
        for (_, name) in self.chunk_cookies(cookies) {
            lookup = lookup.with_mutation(CookieMutation::remove(name));
        }
        lookup
    }

    /// Mutations that store `value` as the session, chunking it when it does
    /// not fit one cookie and removing whatever the request carried that the
    /// new layout no longer uses.
    fn store_session(&self, value: &str, cookies: &[(String, String)]) -> Vec<CookieMutation> {
        let mut mutations = Vec::new();

        if value.len() <= MAX_CHUNK_SIZE {
            mutations.push(
                CookieMutation::set(self.cookie_name.clone(), value)
                    .with_options(self.session_options()),
            );
            for (_, name) in self.chunk_cookies(cookies) {
                mutations.push(CookieMutation::remove(name));
            }
            return mutations;
        }

        // The value is base64url text, so byte offsets are char boundaries.
        let chunks: Vec<&str> = value
            .as_bytes()
            .chunks(MAX_CHUNK_SIZE)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        for (index, chunk) in chunks.iter().enumerate() {
            mutations.push(
                CookieMutation::set(format!("{}.{}", self.cookie_name, index), *chunk)
                    .with_options(self.session_options()),
            );
        }
        if cookies.iter().any(|(name, _)| name == &self.cookie_name) {
            mutations.push(CookieMutation::remove(self.cookie_name.clone()));
        }
        for (index, name) in self.chunk_cookies(cookies) {
            if index >= chunks.len() {
                mutations.push(CookieMutation::remove(name));
            }
        }
        mutations
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthResponse, IdentityError> {
        self.transport
            .send(AuthRequest {
                method: Method::GET,
                url: format!("{}/auth/v1/user", self.base_url),
                headers: vec![
                    ("apikey".to_string(), self.anon_key.clone()),
                    ("Authorization".to_string(), format!("Bearer {}", access_token)),
                ],
                body: None,
            })
            .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, IdentityError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.transport
            .send(AuthRequest {
                method: Method::POST,
                url: format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url),
                headers: vec![
                    ("apikey".to_string(), self.anon_key.clone()),
                    ("Content-Type".to_string(), "application/json".to_string()),
                ],
                body: Some(body.to_string().into_bytes()),
            })
            .await
    }
}

fn is_unauthorized(status: u16) -> bool {
    status == 401 || status == 403
}

#[async_trait(?Send)]
impl<T: AuthTransport> IdentityProvider for SupabaseIdentity<T> {
    async fn current_user(
        &self,
        cookies: &[(String, String)],
    ) -> Result<IdentityLookup, IdentityError> {
        let Some(raw) = self.session_cookie(cookies) else {
            return Ok(IdentityLookup::anonymous());
        };

        let session = match decode_session(&raw) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session cookie");
                return Ok(self.clear_session(cookies));
            }
        };

        let response = self.fetch_user(&session.access_token).await?;
        match response.status {
            200 => {
                let user: AuthUser = serde_json::from_slice(&response.body)
                    .map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
                return Ok(IdentityLookup::authenticated(user.into()));
            }
            status if is_unauthorized(status) => {}
            status => return Err(IdentityError::Status { status }),
        }

        tracing::debug!("access token rejected, refreshing session");
        let response = self.refresh(&session.refresh_token).await?;
        match response.status {
            200 => {
                let refreshed: StoredSession = serde_json::from_slice(&response.body)
                    .map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
                let Some(user) = refreshed.user.clone() else {
                    return Err(IdentityError::MalformedSession(
                        "refresh response carried no user".to_string(),
                    ));
                };
                let value = encode_session(&refreshed)?;
                Ok(self
                    .store_session(&value, cookies)
                    .into_iter()
                    .fold(IdentityLookup::authenticated(user.into()), IdentityLookup::with_mutation))
            }
            400 | 401 | 403 => {
                tracing::debug!("refresh token rejected, signing out");
                Ok(self.clear_session(cookies))
            }
            status => Err(IdentityError::Status { status }),
        }
    }
}
