//! The per-request middleware state machine.

use std::sync::Arc;

use mezze_cache::{
    detect_encoding, generate_headers, header_names, CachePolicy, ContentEncoding, HeaderSet,
    PolicyTable, VARY_ACCEPT_ENCODING,
};
use mezze_core::{PhaseObserver, RequestContext, RequestPhase, RoutesConfig};
use serde::{Deserialize, Serialize};

use crate::error::MiddlewareError;
use crate::identity::{IdentityLookup, IdentityProvider};
use crate::redirect::check_redirect;
use crate::response::MiddlewareResponse;

/// What to do when the identity provider fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityFailurePolicy {
    /// Abort with `MiddlewareError::Identity` (served as 503).
    #[default]
    Reject,
    /// Continue as an anonymous request. Protected paths still redirect to login.
    TreatAsAnonymous,
}

/// Request middleware: identity refresh, redirects, cache and compression headers.
pub struct SiteMiddleware<P> {
    identity: P,
    table: Arc<PolicyTable>,
    routes: Arc<RoutesConfig>,
    failure_policy: IdentityFailurePolicy,
    observer: Option<Arc<dyn PhaseObserver>>,
}

impl<P: IdentityProvider> SiteMiddleware<P> {
    pub fn new(identity: P, table: Arc<PolicyTable>, routes: Arc<RoutesConfig>) -> Self {
        Self {
            identity,
            table,
            routes,
            failure_policy: IdentityFailurePolicy::default(),
            observer: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: IdentityFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run one request through every phase.
    ///
    /// Cookie mutations from the identity provider are the first headers
    /// written and survive both redirects and header merging.
    pub async fn handle(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<MiddlewareResponse, MiddlewareError> {
        self.enter(ctx, RequestPhase::Start);
        let mut headers = HeaderSet::new();

        // Start -> AuthRefreshed
        let lookup = self.lookup_identity(ctx).await?;
        for mutation in &lookup.cookie_mutations {
            headers.append(header_names::SET_COOKIE, mutation.to_header_value());
        }
        let user = lookup.user;
        self.enter(ctx, RequestPhase::AuthRefreshed);

        // AuthRefreshed -> RouteChecked
        let decision = check_redirect(&self.routes, &ctx.path, user.as_ref());
        if let Some(location) = decision.target(&self.routes) {
            tracing::debug!(
                request_id = %ctx.request_id,
                path = %ctx.path,
                location,
                "redirecting"
            );
            let location = if ctx.raw_query.is_empty() {
                location.to_string()
            } else {
                format!("{}?{}", location, ctx.raw_query)
            };
            return Ok(MiddlewareResponse::redirect(&location, headers, user));
        }
        self.enter(ctx, RequestPhase::RouteChecked);

        // RouteChecked -> HeadersApplied
        let encoding = detect_encoding(ctx.accept_encoding());
        headers.merge(self.response_headers(ctx, encoding));
        self.enter(ctx, RequestPhase::HeadersApplied);

        // HeadersApplied -> Done
        self.enter(ctx, RequestPhase::Done);
        Ok(MiddlewareResponse::next(headers, encoding, user))
    }

    async fn lookup_identity(
        &self,
        ctx: &RequestContext,
    ) -> Result<IdentityLookup, MiddlewareError> {
        match self.identity.current_user(&ctx.cookies).await {
            Ok(lookup) => Ok(lookup),
            Err(err) => match self.failure_policy {
                IdentityFailurePolicy::Reject => {
                    tracing::error!(
                        request_id = %ctx.request_id,
                        path = %ctx.path,
                        error = %err,
                        "identity lookup failed, rejecting request"
                    );
                    Err(MiddlewareError::Identity(err))
                }
                IdentityFailurePolicy::TreatAsAnonymous => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        path = %ctx.path,
                        error = %err,
                        "identity lookup failed, continuing as anonymous"
                    );
                    Ok(IdentityLookup::anonymous())
                }
            },
        }
    }

    /// Cache and compression headers for a request that was not redirected.
    fn response_headers(&self, ctx: &RequestContext, encoding: ContentEncoding) -> HeaderSet {
        let mut headers = HeaderSet::new();
        headers.set(header_names::VARY, VARY_ACCEPT_ENCODING);

        if ctx.has_query_param(&self.routes.data_fetch_param) {
            headers.set(header_names::CACHE_CONTROL, CachePolicy::NoCache.header_value());
            set_encoding(&mut headers, encoding);
        } else {
            let cache = generate_headers(&self.table, &ctx.path);
            let applied = !cache.is_empty();
            headers.merge(cache);
            if applied {
                set_encoding(&mut headers, encoding);
            }

            if self.routes.is_content_page(&ctx.path) {
                headers.set(
                    header_names::CACHE_CONTROL,
                    CachePolicy::ShortTerm.header_value(),
                );
                set_encoding(&mut headers, encoding);
            }
        }

        if self.routes.is_api(&ctx.path) {
            set_encoding(&mut headers, encoding);
        }

        headers
    }

    fn enter(&self, ctx: &mut RequestContext, phase: RequestPhase) {
        ctx.timing.mark_phase(phase);
        tracing::trace!(request_id = %ctx.request_id, %phase, "middleware phase");
        if let Some(observer) = &self.observer {
            observer.on_phase(phase, ctx.timing.elapsed());
        }
    }
}

fn set_encoding(headers: &mut HeaderSet, encoding: ContentEncoding) {
    if let Some(value) = encoding.header_value() {
        headers.set(header_names::CONTENT_ENCODING, value);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use http::Method;

    use super::*;
    use crate::error::IdentityError;
    use crate::identity::{CookieMutation, User};

    /// Scripted provider for tests.
    struct FakeIdentity {
        user: Option<User>,
        mutations: Vec<CookieMutation>,
        fail: bool,
        calls: Cell<usize>,
    }

    impl FakeIdentity {
        fn anonymous() -> Self {
            Self {
                user: None,
                mutations: Vec::new(),
                fail: false,
                calls: Cell::new(0),
            }
        }

        fn signed_in() -> Self {
            Self {
                user: Some(User::new("user-1").with_email("chef@eastatwest.com")),
                ..Self::anonymous()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::anonymous()
            }
        }

        fn rotating(mut self) -> Self {
            self.mutations = vec![
                CookieMutation::set("sb-abc-auth-token", "rotated"),
                CookieMutation::remove("sb-abc-auth-token-code-verifier"),
            ];
            self
        }
    }

    #[async_trait(?Send)]
    impl IdentityProvider for FakeIdentity {
        async fn current_user(
            &self,
            _cookies: &[(String, String)],
        ) -> Result<IdentityLookup, IdentityError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(IdentityError::Transport("connection refused".to_string()));
            }
            Ok(IdentityLookup {
                user: self.user.clone(),
                cookie_mutations: self.mutations.clone(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        phases: Mutex<Vec<RequestPhase>>,
    }

    impl PhaseObserver for RecordingObserver {
        fn on_phase(&self, phase: RequestPhase, _elapsed: Duration) {
            self.phases.lock().unwrap().push(phase);
        }
    }

    fn middleware(identity: FakeIdentity) -> SiteMiddleware<FakeIdentity> {
        SiteMiddleware::new(
            identity,
            Arc::new(PolicyTable::standard().unwrap()),
            Arc::new(RoutesConfig::default()),
        )
    }

    fn request(path: &str, accept_encoding: &str) -> RequestContext {
        RequestContext::new(Method::GET, path).with_header("Accept-Encoding", accept_encoding)
    }

    // === Redirect Tests ===

    #[tokio::test]
    async fn test_protected_without_user_redirects_to_login() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/protected/dashboard", "br")).await.unwrap();
        assert_eq!(response.location(), Some("/login"));
        assert_eq!(response.status(), 307);
        assert_eq!(response.phase, RequestPhase::AuthRefreshed);
        assert!(!response.headers.contains("Cache-Control"));
    }

    #[tokio::test]
    async fn test_redirect_keeps_query_string() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw
            .handle(&mut request("/protected/orders?tab=open&page=2", ""))
            .await
            .unwrap();
        assert_eq!(response.location(), Some("/login?tab=open&page=2"));
        assert_eq!(response.headers.get("Location"), Some("/login?tab=open&page=2"));
    }

    #[tokio::test]
    async fn test_login_with_user_redirects_to_dashboard() {
        let mw = middleware(FakeIdentity::signed_in());
        let response = mw.handle(&mut request("/login", "")).await.unwrap();
        assert_eq!(response.location(), Some("/dashboard"));
        assert_eq!(response.user.unwrap().id, "user-1");
    }

    #[tokio::test]
    async fn test_no_redirect_otherwise() {
        let signed_in = middleware(FakeIdentity::signed_in());
        let anonymous = middleware(FakeIdentity::anonymous());
        for path in ["/", "/menu", "/protected/orders"] {
            let response = signed_in.handle(&mut request(path, "")).await.unwrap();
            assert!(!response.is_redirect(), "{}", path);
        }
        for path in ["/", "/login", "/menu"] {
            let response = anonymous.handle(&mut request(path, "")).await.unwrap();
            assert!(!response.is_redirect(), "{}", path);
            assert_eq!(response.phase, RequestPhase::Done);
        }
    }

    // === Cookie Propagation Tests ===

    #[tokio::test]
    async fn test_cookies_forwarded_on_redirect() {
        let mw = middleware(FakeIdentity::anonymous().rotating());
        let response = mw.handle(&mut request("/protected", "gzip")).await.unwrap();
        let cookies = response.headers.get_all("Set-Cookie");
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("sb-abc-auth-token=rotated"));
        assert!(cookies[1].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_cookies_come_first() {
        let mw = middleware(FakeIdentity::signed_in().rotating());
        let response = mw.handle(&mut request("/images/logo.svg", "br")).await.unwrap();
        let names: Vec<&str> = response.headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names[0], "Set-Cookie");
        assert_eq!(names[1], "Set-Cookie");
        assert!(response.headers.contains("Cache-Control"));
    }

    // === Identity Failure Tests ===

    #[tokio::test]
    async fn test_identity_failure_rejects_by_default() {
        let mw = middleware(FakeIdentity::failing());
        let err = mw.handle(&mut request("/menu", "")).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::Identity(_)));
        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test]
    async fn test_identity_failure_as_anonymous() {
        let mw = middleware(FakeIdentity::failing())
            .with_failure_policy(IdentityFailurePolicy::TreatAsAnonymous);
        let page = mw.handle(&mut request("/menu", "gzip")).await.unwrap();
        assert!(!page.is_redirect());
        assert!(page.user.is_none());

        let protected = mw.handle(&mut request("/protected/x", "")).await.unwrap();
        assert_eq!(protected.location(), Some("/login"));
    }

    #[tokio::test]
    async fn test_identity_consulted_once() {
        let mw = middleware(FakeIdentity::anonymous());
        mw.handle(&mut request("/gallery", "br")).await.unwrap();
        assert_eq!(mw.identity.calls.get(), 1);
    }

    // === Header Tests ===

    #[tokio::test]
    async fn test_restaurant_guru_svg_scenario() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw
            .handle(&mut request("/assets/restaurant-guru/star_red.svg", "br, gzip"))
            .await
            .unwrap();
        let h = &response.headers;
        assert_eq!(h.get("Cache-Control"), Some("public, max-age=31536000, immutable"));
        assert_eq!(h.get("Content-Encoding"), Some("br"));
        assert_eq!(h.get("Content-Type"), Some("image/svg+xml"));
        assert_eq!(h.get("X-Cache-Tag"), Some("restaurant-guru-immutable"));
        assert_eq!(h.get("Vary"), Some("Accept-Encoding"));
        assert!(h.get("ETag").is_some());
        assert_eq!(response.encoding, ContentEncoding::Brotli);
    }

    #[tokio::test]
    async fn test_gallery_scenario() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/gallery", "gzip")).await.unwrap();
        assert_eq!(response.headers.get("Cache-Control"), Some("public, max-age=300"));
        assert_eq!(response.headers.get("Content-Encoding"), Some("gzip"));
    }

    #[tokio::test]
    async fn test_vary_always_present() {
        let mw = middleware(FakeIdentity::anonymous());
        for path in ["/", "/about", "/api/contact", "/images/a.png", "/menu?_rsc=1"] {
            let response = mw.handle(&mut request(path, "")).await.unwrap();
            assert_eq!(response.headers.get_all("Vary"), vec!["Accept-Encoding"], "{}", path);
        }
    }

    #[tokio::test]
    async fn test_data_fetch_is_no_store() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/menu?_rsc=abc", "br")).await.unwrap();
        assert_eq!(
            response.headers.get("Cache-Control"),
            Some("private, no-cache, no-store, max-age=0, must-revalidate")
        );
        assert_eq!(response.headers.get("Content-Encoding"), Some("br"));
        assert!(!response.headers.contains("ETag"));
    }

    #[tokio::test]
    async fn test_unmatched_page_gets_no_cache_control() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/about", "br")).await.unwrap();
        assert!(!response.headers.contains("Cache-Control"));
        assert!(!response.headers.contains("Content-Encoding"));
    }

    #[tokio::test]
    async fn test_content_path_override_skips_files() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/menu/card.pdf", "gzip")).await.unwrap();
        assert_eq!(response.headers.get("Cache-Control"), Some("public, max-age=2592000"));

        let nested = mw.handle(&mut request("/fr/menu", "")).await.unwrap();
        assert_eq!(nested.headers.get("Cache-Control"), Some("public, max-age=300"));
        assert!(!nested.headers.contains("Content-Encoding"));
    }

    #[tokio::test]
    async fn test_api_gets_encoding_only() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/api/contact", "gzip, br")).await.unwrap();
        assert_eq!(response.headers.get("Content-Encoding"), Some("br"));
        assert!(!response.headers.contains("Cache-Control"));
    }

    #[tokio::test]
    async fn test_no_encoding_when_not_accepted() {
        let mw = middleware(FakeIdentity::anonymous());
        let response = mw.handle(&mut request("/images/a.webp", "identity")).await.unwrap();
        assert_eq!(response.headers.get("Cache-Control"), Some("public, max-age=15768000"));
        assert!(!response.headers.contains("Content-Encoding"));
    }

    // === Phase Tests ===

    #[tokio::test]
    async fn test_phases_observed_in_order() {
        let observer = Arc::new(RecordingObserver::default());
        let mw = middleware(FakeIdentity::anonymous()).with_observer(observer.clone());
        let mut ctx = request("/menu", "br");
        mw.handle(&mut ctx).await.unwrap();
        assert_eq!(
            *observer.phases.lock().unwrap(),
            vec![
                RequestPhase::Start,
                RequestPhase::AuthRefreshed,
                RequestPhase::RouteChecked,
                RequestPhase::HeadersApplied,
                RequestPhase::Done,
            ]
        );
        assert!(ctx.timing.time_to_phase(RequestPhase::Done).is_some());
    }

    #[tokio::test]
    async fn test_redirect_skips_later_phases() {
        let observer = Arc::new(RecordingObserver::default());
        let mw = middleware(FakeIdentity::anonymous()).with_observer(observer.clone());
        mw.handle(&mut request("/protected", "")).await.unwrap();
        assert_eq!(
            *observer.phases.lock().unwrap(),
            vec![RequestPhase::Start, RequestPhase::AuthRefreshed]
        );
    }
}
