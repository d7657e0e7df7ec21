//! Identity backend selection.

use async_trait::async_trait;
use mezze_core::IdentityConfig;
use mezze_middleware::{AnonymousIdentity, IdentityError, IdentityLookup, IdentityProvider};
use mezze_site::SupabaseIdentity;

use crate::transport::SpinAuthTransport;

/// Supabase when configured, anonymous otherwise.
pub enum SiteIdentity {
    Supabase(SupabaseIdentity<SpinAuthTransport>),
    Anonymous(AnonymousIdentity),
}

impl SiteIdentity {
    pub fn from_config(config: &IdentityConfig) -> Self {
        match SupabaseIdentity::new(config, SpinAuthTransport) {
            Ok(identity) => Self::Supabase(identity),
            Err(e) => {
                tracing::debug!(error = %e, "using anonymous identity");
                Self::Anonymous(AnonymousIdentity)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Supabase(_))
    }
}

#[async_trait(?Send)]
impl IdentityProvider for SiteIdentity {
    async fn current_user(
        &self,
        cookies: &[(String, String)],
    ) -> Result<IdentityLookup, IdentityError> {
        match self {
            Self::Supabase(identity) => identity.current_user(cookies).await,
            Self::Anonymous(identity) => identity.current_user(cookies).await,
        }
    }
}
