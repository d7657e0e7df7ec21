//! Site configuration.
//!
//! Non-secret settings live in `mezze.toml`; credentials are read from the
//! environment so the same file can be committed and shared across deploys.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level site configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public site identity.
    #[serde(default)]
    pub site: SiteInfo,

    /// Route prefixes used by the middleware.
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Deferred stylesheet loading.
    #[serde(default)]
    pub css: CssConfig,

    /// Identity provider endpoint.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Outbound email.
    #[serde(default)]
    pub mail: MailConfig,
}

impl SiteConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML or JSON file (chosen by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Fill unset credentials from the process environment.
    pub fn with_env(mut self) -> Self {
        self.identity = self.identity.merge_env(|k| std::env::var(k).ok());
        self.mail = self.mail.merge_env(|k| std::env::var(k).ok());
        self
    }
}

/// Public site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Restaurant name.
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Canonical origin without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale served without a path prefix.
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// All locales the site is published in.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
}

fn default_site_name() -> String {
    "East @ West".to_string()
}

fn default_base_url() -> String {
    "https://eastatwest.com".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string(), "fr".to_string(), "nl".to_string()]
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
            default_locale: default_locale(),
            locales: default_locales(),
        }
    }
}

impl SiteInfo {
    /// Absolute URL for a site-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() || path == "/" {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Route prefixes consulted by the request middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Paths under this prefix require an authenticated user.
    #[serde(default = "default_protected_prefix")]
    pub protected_prefix: String,

    /// Login page.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Where authenticated users land when they hit the login page.
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,

    /// Query parameter marking a framework data-fetch request.
    #[serde(default = "default_data_fetch_param")]
    pub data_fetch_param: String,

    /// High-traffic content sections forced to short-term caching.
    #[serde(default = "default_content_paths")]
    pub content_paths: Vec<String>,

    /// API prefix.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

fn default_protected_prefix() -> String {
    "/protected".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_dashboard_path() -> String {
    "/dashboard".to_string()
}

fn default_data_fetch_param() -> String {
    "_rsc".to_string()
}

fn default_content_paths() -> Vec<String> {
    vec![
        "gallery".to_string(),
        "reservations".to_string(),
        "menu".to_string(),
    ]
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            protected_prefix: default_protected_prefix(),
            login_path: default_login_path(),
            dashboard_path: default_dashboard_path(),
            data_fetch_param: default_data_fetch_param(),
            content_paths: default_content_paths(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl RoutesConfig {
    /// Whether `path` equals `prefix` or sits below it on a segment boundary.
    pub fn is_under(path: &str, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Whether the path requires authentication.
    pub fn is_protected(&self, path: &str) -> bool {
        Self::is_under(path, &self.protected_prefix)
    }

    /// Whether the path is exactly the login page.
    pub fn is_login(&self, path: &str) -> bool {
        path == self.login_path
    }

    /// Whether the path is an API route.
    pub fn is_api(&self, path: &str) -> bool {
        Self::is_under(path, &self.api_prefix)
    }

    /// Whether the path is a high-traffic content page.
    ///
    /// A segment must equal one of the content names and the final segment
    /// must not look like a file, so `/menu/lunch` matches while
    /// `/menu/card.pdf` keeps its asset policy.
    pub fn is_content_page(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(last) = segments.last() else {
            return false;
        };
        if last.contains('.') {
            return false;
        }
        segments
            .iter()
            .any(|seg| self.content_paths.iter().any(|c| c == seg))
    }

    /// Reject settings that would make the redirect rules loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("protected_prefix", &self.protected_prefix),
            ("login_path", &self.login_path),
            ("dashboard_path", &self.dashboard_path),
            ("api_prefix", &self.api_prefix),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "routes.{} must start with '/': {}",
                    name, value
                )));
            }
        }
        if self.is_protected(&self.login_path) {
            return Err(ConfigError::Invalid(format!(
                "login path {} is under the protected prefix {}",
                self.login_path, self.protected_prefix
            )));
        }
        if self.login_path == self.dashboard_path {
            return Err(ConfigError::Invalid(
                "login and dashboard paths must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deferred stylesheet loading timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    /// Public URL of the deferred stylesheet.
    #[serde(default = "default_deferred_href")]
    pub deferred_href: String,

    /// Upper bound handed to the idle-callback primitive.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Timer used instead when no idle primitive exists.
    #[serde(default = "default_idle_fallback_ms")]
    pub idle_fallback_ms: u64,

    /// Unconditional load trigger.
    #[serde(default = "default_fallback_ms")]
    pub fallback_ms: u64,

    /// Forces `media="all"` if the load event is never observed.
    #[serde(default = "default_activation_timeout_ms")]
    pub activation_timeout_ms: u64,

    /// Images fetched eagerly with high priority.
    #[serde(default = "default_critical_images")]
    pub critical_images: Vec<String>,

    /// Images prefetched during idle time.
    #[serde(default = "default_prefetch_images")]
    pub prefetch_images: Vec<String>,
}

fn default_deferred_href() -> String {
    "/css/deferred-styles.css".to_string()
}

fn default_idle_timeout_ms() -> u64 {
    100
}

fn default_idle_fallback_ms() -> u64 {
    50
}

fn default_fallback_ms() -> u64 {
    1000
}

fn default_activation_timeout_ms() -> u64 {
    3000
}

fn default_critical_images() -> Vec<String> {
    vec!["/images/banner.webp".to_string()]
}

fn default_prefetch_images() -> Vec<String> {
    vec![
        "/images/parallax-image.webp".to_string(),
        "/images/guru2023.webp".to_string(),
        "/images/guru2024.webp".to_string(),
    ]
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            deferred_href: default_deferred_href(),
            idle_timeout_ms: default_idle_timeout_ms(),
            idle_fallback_ms: default_idle_fallback_ms(),
            fallback_ms: default_fallback_ms(),
            activation_timeout_ms: default_activation_timeout_ms(),
            critical_images: default_critical_images(),
            prefetch_images: default_prefetch_images(),
        }
    }
}

/// Identity provider endpoint and public key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public anon key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

/// Why an identity configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingUrl,
    MissingKey,
    Placeholder,
    InsecureUrl,
    KeyTooShort(usize),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUrl => write!(f, "identity url is not configured"),
            Self::MissingKey => write!(f, "identity anon key is not configured"),
            Self::Placeholder => write!(f, "identity settings look like placeholder values"),
            Self::InsecureUrl => write!(f, "identity url should start with https://"),
            Self::KeyTooShort(len) => {
                write!(f, "identity anon key appears to be invalid ({} chars)", len)
            }
        }
    }
}

/// Minimum plausible length of a real anon key.
pub const MIN_ANON_KEY_LEN: usize = 40;

impl IdentityConfig {
    /// Read from environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_env(|k| std::env::var(k).ok())
    }

    /// Fill unset fields through a variable lookup.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));
        if self.url.is_none() {
            self.url = first(&["NEXT_PUBLIC_SUPABASE_URL", "SUPABASE_URL"]);
        }
        if self.anon_key.is_none() {
            self.anon_key = first(&["NEXT_PUBLIC_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"]);
        }
        self
    }

    /// Validate the settings, returning the first problem found.
    pub fn check(&self) -> Result<(), ConfigIssue> {
        let url = self.url.as_deref().ok_or(ConfigIssue::MissingUrl)?;
        let key = self.anon_key.as_deref().ok_or(ConfigIssue::MissingKey)?;

        if looks_placeholder(url) || looks_placeholder(key) {
            return Err(ConfigIssue::Placeholder);
        }
        if !url.starts_with("https://") {
            return Err(ConfigIssue::InsecureUrl);
        }
        if key.len() < MIN_ANON_KEY_LEN {
            return Err(ConfigIssue::KeyTooShort(key.len()));
        }
        Ok(())
    }

    /// Whether `check` passes.
    pub fn is_configured(&self) -> bool {
        self.check().is_ok()
    }
}

fn looks_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("placeholder") || lower.contains("your_supabase")
}

/// Default sender when none is configured.
pub const DEFAULT_FROM_EMAIL: &str = "contact@eastatwest.com";

/// Outbound email configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    /// HTTP email API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resend: Option<ResendConfig>,

    /// SMTP relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
}

/// Resend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    /// API key. Not serialized.
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
}

/// SMTP relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Implicit TLS when true, STARTTLS otherwise.
    #[serde(default)]
    pub secure: bool,
    pub user: String,
    /// Password. Not serialized.
    #[serde(skip_serializing, default)]
    pub pass: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
}

fn default_from_email() -> String {
    DEFAULT_FROM_EMAIL.to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl MailConfig {
    /// Read from environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_env(|k| std::env::var(k).ok())
    }

    /// Fill unset providers through a variable lookup.
    ///
    /// SMTP is only configured when host, port, user and pass are all present.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |k: &str| lookup(k).filter(|v| !v.is_empty());

        if self.resend.is_none() {
            if let Some(api_key) = var("RESEND_API_KEY") {
                self.resend = Some(ResendConfig {
                    api_key,
                    from_email: var("RESEND_FROM_EMAIL").unwrap_or_else(default_from_email),
                });
            }
        } else if let Some(resend) = self.resend.as_mut() {
            if resend.api_key.is_empty() {
                resend.api_key = var("RESEND_API_KEY").unwrap_or_default();
            }
        }

        if self.smtp.is_none() {
            let host = var("SMTP_HOST");
            let port = var("SMTP_PORT");
            let user = var("SMTP_USER");
            let pass = var("SMTP_PASS");
            if let (Some(host), Some(port), Some(user), Some(pass)) = (host, port, user, pass) {
                self.smtp = Some(SmtpConfig {
                    host,
                    port: port.parse().unwrap_or_else(|_| default_smtp_port()),
                    secure: var("SMTP_SECURE").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
                    user,
                    pass,
                    from_email: var("SMTP_FROM_EMAIL").unwrap_or_else(default_from_email),
                });
            }
        } else if let Some(smtp) = self.smtp.as_mut() {
            if smtp.pass.is_empty() {
                smtp.pass = var("SMTP_PASS").unwrap_or_default();
            }
        }

        self
    }

    /// Whether at least one provider is usable.
    pub fn has_provider(&self) -> bool {
        self.resend.as_ref().is_some_and(|r| !r.api_key.is_empty())
            || self.smtp.as_ref().is_some_and(|s| !s.pass.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const GOOD_KEY: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoiYW5vbiJ9";

    // === Parsing Tests ===

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.routes.login_path, "/login");
        assert_eq!(config.routes.dashboard_path, "/dashboard");
        assert_eq!(config.routes.data_fetch_param, "_rsc");
        assert_eq!(config.css.deferred_href, "/css/deferred-styles.css");
        assert_eq!(config.css.fallback_ms, 1000);
        assert_eq!(config.site.base_url, "https://eastatwest.com");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SiteConfig::from_toml_str(
            r#"
            [routes]
            protected_prefix = "/admin"

            [css]
            fallback_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(config.routes.protected_prefix, "/admin");
        assert_eq!(config.routes.login_path, "/login");
        assert_eq!(config.css.fallback_ms, 1500);
        assert_eq!(config.css.activation_timeout_ms, 3000);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            SiteConfig::from_toml_str("[routes"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_toml_round_trip_keeps_routes() {
        let text = SiteConfig::default().to_toml_string().unwrap();
        let parsed = SiteConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.routes.content_paths, vec!["gallery", "reservations", "menu"]);
    }

    // === Route Matching Tests ===

    #[rstest]
    #[case("/protected", true)]
    #[case("/protected/dashboard", true)]
    #[case("/protectedness", false)]
    #[case("/public/protected", false)]
    fn test_is_protected(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(RoutesConfig::default().is_protected(path), expected);
    }

    #[rstest]
    #[case("/gallery", true)]
    #[case("/fr/menu", true)]
    #[case("/reservations/confirm", true)]
    #[case("/menu/card.pdf", false)]
    #[case("/galleryx", false)]
    #[case("/", false)]
    fn test_is_content_page(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(RoutesConfig::default().is_content_page(path), expected);
    }

    #[test]
    fn test_routes_validate() {
        assert!(RoutesConfig::default().validate().is_ok());

        let looping = RoutesConfig {
            protected_prefix: "/".to_string(),
            ..Default::default()
        };
        assert!(matches!(looping.validate(), Err(ConfigError::Invalid(_))));

        let relative = RoutesConfig {
            login_path: "login".to_string(),
            ..Default::default()
        };
        assert!(relative.validate().is_err());
    }

    #[test]
    fn test_is_login_exact() {
        let routes = RoutesConfig::default();
        assert!(routes.is_login("/login"));
        assert!(!routes.is_login("/login/reset"));
    }

    #[test]
    fn test_absolute_url() {
        let site = SiteInfo::default();
        assert_eq!(site.absolute_url(""), "https://eastatwest.com");
        assert_eq!(site.absolute_url("/menu"), "https://eastatwest.com/menu");
        assert_eq!(site.absolute_url("menu"), "https://eastatwest.com/menu");
    }

    // === Identity Check Tests ===

    #[test]
    fn test_identity_valid() {
        let config = IdentityConfig::default().merge_env(lookup(&[
            ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", GOOD_KEY),
        ]));
        assert_eq!(config.check(), Ok(()));
    }

    #[rstest]
    #[case(None, Some(GOOD_KEY), ConfigIssue::MissingUrl)]
    #[case(Some("https://abc.supabase.co"), None, ConfigIssue::MissingKey)]
    #[case(Some("https://your_supabase_url"), Some(GOOD_KEY), ConfigIssue::Placeholder)]
    #[case(Some("https://abc.supabase.co"), Some("PLACEHOLDER-key-value-that-is-long-enough-xx"), ConfigIssue::Placeholder)]
    #[case(Some("http://abc.supabase.co"), Some(GOOD_KEY), ConfigIssue::InsecureUrl)]
    #[case(Some("https://abc.supabase.co"), Some("short"), ConfigIssue::KeyTooShort(5))]
    fn test_identity_issues(
        #[case] url: Option<&str>,
        #[case] key: Option<&str>,
        #[case] expected: ConfigIssue,
    ) {
        let config = IdentityConfig {
            url: url.map(String::from),
            anon_key: key.map(String::from),
        };
        assert_eq!(config.check(), Err(expected));
    }

    #[test]
    fn test_identity_file_value_wins_over_env() {
        let config = IdentityConfig {
            url: Some("https://file.supabase.co".to_string()),
            anon_key: None,
        }
        .merge_env(lookup(&[
            ("SUPABASE_URL", "https://env.supabase.co"),
            ("SUPABASE_ANON_KEY", GOOD_KEY),
        ]));
        assert_eq!(config.url.as_deref(), Some("https://file.supabase.co"));
        assert_eq!(config.anon_key.as_deref(), Some(GOOD_KEY));
    }

    // === Mail Config Tests ===

    #[test]
    fn test_mail_resend_from_env() {
        let config = MailConfig::default().merge_env(lookup(&[("RESEND_API_KEY", "re_123")]));
        let resend = config.resend.as_ref().unwrap();
        assert_eq!(resend.api_key, "re_123");
        assert_eq!(resend.from_email, DEFAULT_FROM_EMAIL);
        assert!(config.smtp.is_none());
        assert!(config.has_provider());
    }

    #[test]
    fn test_mail_smtp_requires_all_fields() {
        let partial = MailConfig::default().merge_env(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "mailer"),
        ]));
        assert!(partial.smtp.is_none());
        assert!(!partial.has_provider());

        let full = MailConfig::default().merge_env(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", "secret"),
            ("SMTP_SECURE", "true"),
            ("SMTP_FROM_EMAIL", "hello@eastatwest.com"),
        ]));
        let smtp = full.smtp.unwrap();
        assert_eq!(smtp.port, 465);
        assert!(smtp.secure);
        assert_eq!(smtp.from_email, "hello@eastatwest.com");
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("True", true)]
    #[case("false", false)]
    #[case("1", false)]
    fn test_mail_smtp_secure_flag(#[case] value: &str, #[case] secure: bool) {
        let config = MailConfig::default().merge_env(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", "secret"),
            ("SMTP_SECURE", value),
        ]));
        assert_eq!(config.smtp.unwrap().secure, secure);
    }

    #[test]
    fn test_mail_bad_port_falls_back() {
        let config = MailConfig::default().merge_env(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "not-a-port"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASS", "secret"),
        ]));
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert!(!smtp.secure);
    }
}
