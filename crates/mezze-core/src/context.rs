//! Request context with typed parameters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use cookie::Cookie;
use http::Method;

use crate::lifecycle::TimingContext;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static REQUEST_COUNTER: AtomicU32 = AtomicU32::new(0);

impl RequestId {
    /// Generate a new request ID.
    ///
    /// Combines wall-clock nanoseconds with a process-wide counter so two
    /// requests started in the same nanosecond still get distinct IDs.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mixed = (nanos as u32).rotate_left(13) ^ seq.wrapping_mul(0x9E37_79B9);
        Self(format!("{:x}-{:08x}-{:x}", nanos, mixed, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// HTTP headers.
pub type Headers = HashMap<String, String>;

/// Typed request context consumed by the middleware and site router.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// Query string as received, without the leading `?`. Empty when absent.
    pub raw_query: String,
    /// HTTP headers.
    pub headers: Headers,
    /// Request cookies in the order the client sent them.
    pub cookies: Vec<(String, String)>,
    /// Timing context for observability.
    pub timing: TimingContext,
}

impl RequestContext {
    /// Create a new request context from a method and a path that may carry a query string.
    pub fn new(method: Method, path_and_query: impl AsRef<str>) -> Self {
        let raw = path_and_query.as_ref();
        let (path, query) = split_path_and_query(raw);
        Self {
            request_id: RequestId::generate(),
            method,
            path,
            query,
            raw_query: raw.split_once('?').map(|(_, q)| q.to_string()).unwrap_or_default(),
            headers: HashMap::new(),
            cookies: Vec::new(),
            timing: TimingContext::new(),
        }
    }

    /// Build a context from an `http::Request`, ignoring the body.
    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut ctx = Self::new(req.method().clone(), path_and_query);
        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                ctx = ctx.with_header(name.as_str(), value);
            }
        }
        ctx
    }

    /// Add a header. A `Cookie` header is also parsed into `cookies`.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies.extend(parse_cookie_header(value));
        }
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a single cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Whether the query string carries the given parameter, with or without a value.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The raw Accept-Encoding value, or an empty string when absent.
    pub fn accept_encoding(&self) -> &str {
        self.header("accept-encoding").unwrap_or("")
    }

    /// Get a cookie value by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a `Cookie` request header into name/value pairs, skipping malformed entries.
pub fn parse_cookie_header(value: &str) -> Vec<(String, String)> {
    Cookie::split_parse(value)
        .filter_map(|c| c.ok())
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}

fn split_path_and_query(raw: &str) -> (String, QueryParams) {
    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, query),
        None => (raw, ""),
    };

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();

    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Request ID Tests ===

    #[test]
    fn test_request_id_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::from_string("abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }

    // === Path and Query Tests ===

    #[test]
    fn test_context_splits_query() {
        let ctx = RequestContext::new(Method::GET, "/menu?_rsc=abc&lang");
        assert_eq!(ctx.path, "/menu");
        assert_eq!(ctx.query_param("_rsc"), Some("abc"));
        assert!(ctx.has_query_param("lang"));
        assert_eq!(ctx.query_param("lang"), Some(""));
        assert_eq!(ctx.raw_query, "_rsc=abc&lang");
    }

    #[test]
    fn test_context_without_query() {
        let ctx = RequestContext::new(Method::GET, "/gallery");
        assert_eq!(ctx.path, "/gallery");
        assert!(ctx.query.is_empty());
        assert!(ctx.raw_query.is_empty());
    }

    #[test]
    fn test_context_empty_path_is_root() {
        let ctx = RequestContext::new(Method::GET, "?x=1");
        assert_eq!(ctx.path, "/");
    }

    // === Header and Cookie Tests ===

    #[test]
    fn test_header_case_insensitive() {
        let ctx = RequestContext::new(Method::GET, "/").with_header("Accept-Encoding", "br, gzip");
        assert_eq!(ctx.header("accept-encoding"), Some("br, gzip"));
        assert_eq!(ctx.accept_encoding(), "br, gzip");
    }

    #[test]
    fn test_accept_encoding_missing() {
        let ctx = RequestContext::new(Method::GET, "/");
        assert_eq!(ctx.accept_encoding(), "");
    }

    #[test]
    fn test_cookie_header_parsed() {
        let ctx = RequestContext::new(Method::GET, "/")
            .with_header("Cookie", "sb-abc-auth-token=xyz; theme=dark");
        assert_eq!(ctx.cookies.len(), 2);
        assert_eq!(ctx.cookie("theme"), Some("dark"));
        assert_eq!(ctx.cookie("sb-abc-auth-token"), Some("xyz"));
        assert_eq!(ctx.cookie("missing"), None);
    }

    #[test]
    fn test_from_http_request() {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri("https://eastatwest.com/reservations?_rsc=1")
            .header("accept-encoding", "gzip")
            .header("cookie", "a=1")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_http(&req);
        assert_eq!(ctx.path, "/reservations");
        assert!(ctx.has_query_param("_rsc"));
        assert_eq!(ctx.accept_encoding(), "gzip");
        assert_eq!(ctx.cookie("a"), Some("1"));
    }
}
