//! Identity collaborator contract.

use async_trait::async_trait;
use cookie::Cookie;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider user ID.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// SameSite attribute for outgoing cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// Attributes attached to a cookie mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds. `Some(0)` deletes the cookie.
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

/// A cookie the identity provider wants set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl CookieMutation {
    /// Set a cookie at path `/`.
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: CookieOptions {
                path: Some("/".to_string()),
                ..Default::default()
            },
        }
    }

    /// Expire a cookie immediately.
    pub fn remove(name: impl Into<String>) -> Self {
        let mut mutation = Self::set(name, "");
        mutation.options.max_age = Some(0);
        mutation
    }

    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .http_only(self.options.http_only)
            .secure(self.options.secure);

        if let Some(path) = &self.options.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.options.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.options.max_age {
            builder = builder.max_age(cookie::time::Duration::seconds(max_age));
        }
        if let Some(same_site) = self.options.same_site {
            builder = builder.same_site(same_site.into());
        }

        builder.build().to_string()
    }
}

/// Result of consulting the identity provider for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityLookup {
    pub user: Option<User>,
    /// Forwarded verbatim, in order, before any other header logic.
    pub cookie_mutations: Vec<CookieMutation>,
}

impl IdentityLookup {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            cookie_mutations: Vec::new(),
        }
    }

    pub fn with_mutation(mut self, mutation: CookieMutation) -> Self {
        self.cookie_mutations.push(mutation);
        self
    }
}

/// External identity collaborator.
///
/// Implementations may refresh or rotate session tokens; any cookie changes
/// they need go into `IdentityLookup::cookie_mutations`.
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// Resolve the current user from the request cookies.
    async fn current_user(&self, cookies: &[(String, String)])
        -> Result<IdentityLookup, IdentityError>;
}

/// Provider that never authenticates anyone.
///
/// Used when no identity backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

#[async_trait(?Send)]
impl IdentityProvider for AnonymousIdentity {
    async fn current_user(
        &self,
        _cookies: &[(String, String)],
    ) -> Result<IdentityLookup, IdentityError> {
        Ok(IdentityLookup::anonymous())
    }
}
