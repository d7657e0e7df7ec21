//! Path-based cache policies.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use http::{HeaderName, HeaderValue};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Named cache behaviour with a fixed Cache-Control literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CachePolicy {
    /// Fingerprinted or never-changing assets.
    Immutable,
    /// Media files.
    LongTerm,
    /// Documents such as menus.
    MediumTerm,
    /// High-traffic pages that change daily.
    ShortTerm,
    /// Never stored anywhere.
    NoCache,
}

impl CachePolicy {
    /// All policies, longest-lived first.
    pub const ALL: [CachePolicy; 5] = [
        Self::Immutable,
        Self::LongTerm,
        Self::MediumTerm,
        Self::ShortTerm,
        Self::NoCache,
    ];

    /// The literal Cache-Control value.
    pub fn header_value(&self) -> &'static str {
        match self {
            Self::Immutable => "public, max-age=31536000, immutable",
            Self::LongTerm => "public, max-age=15768000",
            Self::MediumTerm => "public, max-age=2592000",
            Self::ShortTerm => "public, max-age=300",
            Self::NoCache => "private, no-cache, no-store, max-age=0, must-revalidate",
        }
    }

    /// Browser/CDN freshness lifetime.
    pub fn max_age(&self) -> Duration {
        match self {
            Self::Immutable => Duration::from_secs(31_536_000),
            Self::LongTerm => Duration::from_secs(15_768_000),
            Self::MediumTerm => Duration::from_secs(2_592_000),
            Self::ShortTerm => Duration::from_secs(300),
            Self::NoCache => Duration::ZERO,
        }
    }

    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Immutable)
    }

    /// Whether shared caches may store the response.
    pub fn allows_caching(&self) -> bool {
        !matches!(self, Self::NoCache)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Immutable => "IMMUTABLE",
            Self::LongTerm => "LONG_TERM",
            Self::MediumTerm => "MEDIUM_TERM",
            Self::ShortTerm => "SHORT_TERM",
            Self::NoCache => "NO_CACHE",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single path rule. Lower `priority` is evaluated first.
#[derive(Debug, Clone)]
pub struct CachePolicyRule {
    /// Evaluation order; unique within a table.
    pub priority: u32,
    /// Case-sensitive path pattern.
    pub pattern: Regex,
    /// Policy applied on match.
    pub policy: CachePolicy,
    /// Human label.
    pub description: String,
    /// Informational headers attached on match.
    pub tags: Vec<(String, String)>,
}

impl CachePolicyRule {
    /// Compile a rule.
    pub fn new(
        priority: u32,
        pattern: &str,
        policy: CachePolicy,
        description: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let pattern = Regex::new(pattern)
            .map_err(|source| PolicyError::InvalidPattern { priority, source })?;
        Ok(Self {
            priority,
            pattern,
            policy,
            description: description.into(),
            tags: Vec::new(),
        })
    }

    /// Attach an informational header.
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((name.into(), value.into()));
        self
    }

    /// Whether the rule applies to `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    fn validate_tags(&self) -> Result<(), PolicyError> {
        for (name, value) in &self.tags {
            let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
                && HeaderValue::from_str(value).is_ok();
            if !valid {
                return Err(PolicyError::InvalidTag {
                    priority: self.priority,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Serializable rule description, for tables loaded from files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub priority: u32,
    pub pattern: String,
    pub policy: CachePolicy,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl RuleSpec {
    fn compile(self) -> Result<CachePolicyRule, PolicyError> {
        let rule = CachePolicyRule::new(self.priority, &self.pattern, self.policy, self.description)?;
        Ok(self
            .tags
            .into_iter()
            .fold(rule, |rule, (name, value)| rule.with_tag(name, value)))
    }
}

/// Immutable, priority-ordered rule table. First match wins.
///
/// Build once at startup and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: Vec<CachePolicyRule>,
}

impl PolicyTable {
    /// Build a table, ordering rules by priority.
    pub fn new(mut rules: Vec<CachePolicyRule>) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.priority) {
                return Err(PolicyError::DuplicatePriority(rule.priority));
            }
            rule.validate_tags()?;
        }
        rules.sort_by_key(|r| r.priority);
        Ok(Self { rules })
    }

    /// Build a table from serialized rule descriptions.
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, PolicyError> {
        let rules = specs
            .into_iter()
            .map(RuleSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    /// The site's built-in rules.
    ///
    /// Directory rules precede the extension rules they overlap with.
    pub fn standard() -> Result<Self, PolicyError> {
        Self::new(vec![
            CachePolicyRule::new(
                10,
                r"^/_next/static/",
                CachePolicy::Immutable,
                "Framework build output",
            )?,
            CachePolicyRule::new(
                20,
                r"^/assets/restaurant-guru/",
                CachePolicy::Immutable,
                "Restaurant Guru badges",
            )?
            .with_tag("X-Cache-Tag", "restaurant-guru-immutable")
            .with_tag("X-Performance-Optimized", "true"),
            CachePolicyRule::new(30, r"\.svg$", CachePolicy::Immutable, "SVG images")?,
            CachePolicyRule::new(
                40,
                r"\.(woff|woff2|ttf|eot)$",
                CachePolicy::Immutable,
                "Web fonts",
            )?,
            CachePolicyRule::new(
                50,
                r"\.(jpg|jpeg|png|gif|webp|avif|mp4|webm)$",
                CachePolicy::LongTerm,
                "Images and video",
            )?,
            CachePolicyRule::new(60, r"\.pdf$", CachePolicy::MediumTerm, "PDF documents")?,
            CachePolicyRule::new(
                70,
                r"^/assets/.*\.(css|js)$",
                CachePolicy::LongTerm,
                "Static CSS and JS",
            )?,
        ])
    }

    /// First rule matching `path`.
    pub fn resolve(&self, path: &str) -> Option<&CachePolicyRule> {
        self.rules.iter().find(|r| r.matches(path))
    }

    /// Policy of the first rule matching `path`.
    pub fn resolve_policy(&self, path: &str) -> Option<CachePolicy> {
        self.resolve(path).map(|r| r.policy)
    }

    /// Whether `path` resolves to a storable policy.
    pub fn should_cache(&self, path: &str) -> bool {
        self.resolve_policy(path)
            .is_some_and(|p| p.allows_caching())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[CachePolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
