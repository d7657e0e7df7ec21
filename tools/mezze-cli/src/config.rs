//! CLI configuration.

use anyhow::{Context, Result};
use mezze_cache::RuleSpec;
use mezze_core::SiteConfig;
use serde::{Deserialize, Serialize};

/// File names searched for, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["mezze.toml", ".mezze.toml", "mezze.json"];

/// Contents of `mezze.toml`: site settings plus build paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub site: SiteConfig,

    /// Build paths.
    #[serde(default)]
    pub build: BuildConfig,

    /// Cache rules replacing the built-in table when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_rules: Vec<RuleSpec>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &str) -> Result<()> {
        let content = if path.ends_with(".json") {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))
    }
}

/// Where build commands read and write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Critical stylesheet source.
    #[serde(default = "default_critical_src")]
    pub critical_src: String,

    /// Deferred stylesheet source.
    #[serde(default = "default_deferred_src")]
    pub deferred_src: String,

    /// Static file root served by the workload.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            critical_src: default_critical_src(),
            deferred_src: default_deferred_src(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_critical_src() -> String {
    "crates/mezze-css/assets/critical.css".to_string()
}

fn default_deferred_src() -> String {
    "crates/mezze-css/assets/deferred.css".to_string()
}

fn default_public_dir() -> String {
    "workloads/restaurant-site/public".to_string()
}
