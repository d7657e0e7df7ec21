//! Response header computation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::policy::PolicyTable;

/// Header names produced by this platform.
pub mod header_names {
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const VARY: &str = "Vary";
    pub const ETAG: &str = "ETag";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    pub const LOCATION: &str = "Location";
    pub const SET_COOKIE: &str = "Set-Cookie";
    /// Informational cache tag for invalidation tooling.
    pub const X_CACHE_TAG: &str = "X-Cache-Tag";
    /// Marks assets served through the optimised path.
    pub const X_PERFORMANCE_OPTIMIZED: &str = "X-Performance-Optimized";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "X-Request-ID";
}

/// Value used for every Vary header we emit.
pub const VARY_ACCEPT_ENCODING: &str = "Accept-Encoding";

/// Ordered header map with case-insensitive names.
///
/// `set` replaces, `append` keeps duplicates (needed for `Set-Cookie`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing values.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(idx) => {
                self.entries[idx].1 = value;
                let mut i = idx + 1;
                while i < self.entries.len() {
                    if self.entries[i].0.eq_ignore_ascii_case(&name) {
                        self.entries.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Add a header without touching existing values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Merge `other` into `self`. `Set-Cookie` is appended, everything else replaced.
    pub fn merge(&mut self, other: HeaderSet) {
        for (name, value) in other.entries {
            if name.eq_ignore_ascii_case(header_names::SET_COOKIE) {
                self.append(name, value);
            } else {
                self.set(name, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.entries
    }
}

impl IntoIterator for HeaderSet {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, String)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.append(k, v);
        }
        set
    }
}

/// Builder for cache response headers.
#[derive(Debug, Default)]
pub struct CacheHeadersBuilder {
    cache_control: Option<String>,
    vary: Option<String>,
    etag: Option<String>,
    content_type: Option<String>,
    tags: Vec<(String, String)>,
}

impl CacheHeadersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Cache-Control header.
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Set Vary header.
    pub fn vary(mut self, value: impl Into<String>) -> Self {
        self.vary = Some(value.into());
        self
    }

    /// Set ETag header. The value is quoted on output.
    pub fn etag(mut self, value: impl Into<String>) -> Self {
        self.etag = Some(value.into());
        self
    }

    /// Override Content-Type.
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Add an informational header.
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((name.into(), value.into()));
        self
    }

    /// Build the headers.
    pub fn build(self) -> HeaderSet {
        let mut headers = HeaderSet::new();

        if let Some(cc) = self.cache_control {
            headers.set(header_names::CACHE_CONTROL, cc);
        }

        if let Some(vary) = self.vary {
            headers.set(header_names::VARY, vary);
        }

        if let Some(etag) = self.etag {
            headers.set(header_names::ETAG, format!("\"{}\"", etag));
        }

        if let Some(ct) = self.content_type {
            headers.set(header_names::CONTENT_TYPE, ct);
        }

        for (name, value) in self.tags {
            headers.set(name, value);
        }

        headers
    }
}

/// Compute cache headers for `path`.
///
/// Returns an empty set when no rule matches, leaving caching to platform
/// defaults.
pub fn generate_headers(table: &PolicyTable, path: &str) -> HeaderSet {
    let Some(rule) = table.resolve(path) else {
        return HeaderSet::new();
    };

    let mut builder = CacheHeadersBuilder::new()
        .cache_control(rule.policy.header_value())
        .vary(VARY_ACCEPT_ENCODING);

    if rule.policy.is_immutable() {
        builder = builder.etag(path_etag(path));
    }

    if path.ends_with(".svg") {
        builder = builder.content_type("image/svg+xml");
    }

    for (name, value) in &rule.tags {
        builder = builder.tag(name, value);
    }

    builder.build()
}

/// Unquoted ETag for a path: standard base64 of its bytes.
pub fn path_etag(path: &str) -> String {
    STANDARD.encode(path.as_bytes())
}

/// Recover the path from an ETag produced by `generate_headers`.
///
/// Accepts quoted, unquoted and weak (`W/`) forms.
pub fn decode_etag(etag: &str) -> Option<String> {
    let raw = etag.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    let raw = raw.trim_matches('"');
    let bytes = STANDARD.decode(raw).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::policy::CachePolicy;

    fn table() -> PolicyTable {
        PolicyTable::standard().unwrap()
    }

    // === HeaderSet Tests ===

    #[test]
    fn test_header_set_replace_case_insensitive() {
        let mut headers = HeaderSet::new();
        headers.set("cache-control", "a");
        headers.set("Cache-Control", "b");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CACHE-CONTROL"), Some("b"));
    }

    #[test]
    fn test_header_set_append_keeps_duplicates() {
        let mut headers = HeaderSet::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        assert_eq!(headers.get_all("Set-Cookie"), vec!["a=1", "b=2"]);
        headers.set("Set-Cookie", "c=3");
        assert_eq!(headers.get_all("Set-Cookie"), vec!["c=3"]);
    }

    #[test]
    fn test_header_set_merge() {
        let mut base = HeaderSet::new();
        base.append("Set-Cookie", "a=1");
        base.set("Vary", "Accept-Encoding");

        let mut extra = HeaderSet::new();
        extra.append("Set-Cookie", "b=2");
        extra.set("vary", "Accept-Encoding");
        extra.set("Cache-Control", "public, max-age=300");

        base.merge(extra);
        assert_eq!(base.get_all("set-cookie").len(), 2);
        assert_eq!(base.get_all("vary").len(), 1);
        assert_eq!(base.get("cache-control"), Some("public, max-age=300"));
    }

    #[test]
    fn test_header_set_remove() {
        let mut headers: HeaderSet = vec![
            ("A".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
            ("B".to_string(), "3".to_string()),
        ]
        .into_iter()
        .collect();
        headers.remove("a");
        assert_eq!(headers.into_vec(), vec![("B".to_string(), "3".to_string())]);
    }

    // === Generation Tests ===

    #[rstest]
    #[case("/_next/static/chunks/main.js")]
    #[case("/assets/restaurant-guru/badge.png")]
    #[case("/images/icon.svg")]
    #[case("/fonts/inter.woff")]
    #[case("/fonts/inter.ttf")]
    fn test_immutable_paths_get_etag(#[case] path: &str) {
        let headers = generate_headers(&table(), path);
        assert_eq!(
            headers.get("Cache-Control"),
            Some(CachePolicy::Immutable.header_value())
        );
        let etag = headers.get("ETag").unwrap();
        assert!(etag.len() > 2);
        assert_eq!(headers.get("Vary"), Some("Accept-Encoding"));
    }

    #[rstest]
    #[case("/")]
    #[case("/about")]
    #[case("/api/reservations")]
    #[case("/blog/assets/x.css")]
    fn test_unmatched_paths_empty(#[case] path: &str) {
        assert!(generate_headers(&table(), path).is_empty());
    }

    #[test]
    fn test_long_term_has_no_etag() {
        let headers = generate_headers(&table(), "/images/banner.webp");
        assert_eq!(headers.get("Cache-Control"), Some("public, max-age=15768000"));
        assert!(!headers.contains("ETag"));
        assert!(!headers.contains("Content-Type"));
    }

    #[test]
    fn test_restaurant_guru_svg() {
        let headers = generate_headers(&table(), "/assets/restaurant-guru/star_red.svg");
        assert_eq!(
            headers.get("Cache-Control"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(headers.get("Content-Type"), Some("image/svg+xml"));
        assert_eq!(headers.get("X-Cache-Tag"), Some("restaurant-guru-immutable"));
        assert_eq!(headers.get("X-Performance-Optimized"), Some("true"));
    }

    #[test]
    fn test_headers_not_shared_between_calls() {
        let table = table();
        let mut first = generate_headers(&table, "/images/a.svg");
        first.set("Cache-Control", "mutated");
        let second = generate_headers(&table, "/images/a.svg");
        assert_eq!(
            second.get("Cache-Control"),
            Some(CachePolicy::Immutable.header_value())
        );
    }

    // === ETag Tests ===

    #[test]
    fn test_etag_is_quoted_base64() {
        let headers = generate_headers(&table(), "/a.svg");
        assert_eq!(headers.get("ETag"), Some("\"L2Euc3Zn\""));
    }

    #[test]
    fn test_etag_stable_and_distinct() {
        let table = table();
        let a1 = generate_headers(&table, "/fonts/a.woff2");
        let a2 = generate_headers(&table, "/fonts/a.woff2");
        let b = generate_headers(&table, "/fonts/b.woff2");
        assert_eq!(a1.get("ETag"), a2.get("ETag"));
        assert_ne!(a1.get("ETag"), b.get("ETag"));
    }

    #[test]
    fn test_etag_reversible() {
        let path = "/assets/restaurant-guru/star_red.svg";
        let headers = generate_headers(&table(), path);
        assert_eq!(decode_etag(headers.get("ETag").unwrap()).as_deref(), Some(path));
        assert_eq!(decode_etag("W/\"L2Euc3Zn\"").as_deref(), Some("/a.svg"));
        assert_eq!(decode_etag("not base64!"), None);
    }
}
