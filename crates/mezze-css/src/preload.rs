//! Image preload and prefetch hints.

use mezze_core::CssConfig;

use crate::bootstrap::js_string;
use crate::head::escape_attr;

/// Idle timeout for image prefetching.
pub const PREFETCH_IDLE_TIMEOUT_MS: u64 = 2000;

/// Timer used instead when no idle primitive exists.
pub const PREFETCH_FALLBACK_MS: u64 = 1000;

/// Resource hints for page images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHints {
    /// Fetched immediately with high priority.
    pub critical: Vec<String>,
    /// Prefetched at low priority once the page is idle.
    pub prefetch: Vec<String>,
}

impl ImageHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CssConfig) -> Self {
        Self {
            critical: config.critical_images.clone(),
            prefetch: config.prefetch_images.clone(),
        }
    }

    pub fn with_critical(mut self, href: impl Into<String>) -> Self {
        self.critical.push(href.into());
        self
    }

    pub fn with_prefetch(mut self, href: impl Into<String>) -> Self {
        self.prefetch.push(href.into());
        self
    }

    /// `<link rel="preload">` tags for the critical images.
    pub fn render_preload_links(&self) -> String {
        self.critical
            .iter()
            .map(|href| {
                format!(
                    r#"<link rel="preload" as="image" href="{}" fetchpriority="high">"#,
                    escape_attr(href)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inline script that adds `rel="prefetch"` links once the page is idle.
    ///
    /// Returns `None` when there is nothing to prefetch.
    pub fn render_prefetch_script(&self) -> Option<String> {
        if self.prefetch.is_empty() {
            return None;
        }
        let urls = self
            .prefetch
            .iter()
            .map(|href| js_string(href))
            .collect::<Vec<_>>()
            .join(",");

        Some(format!(
            concat!(
                "(function(){{var urls=[{urls}];function prefetch(){{",
                "for(var i=0;i<urls.length;i++){{var link=document.createElement(\"link\");",
                "link.rel=\"prefetch\";link.as=\"image\";link.href=urls[i];",
                "document.head.appendChild(link);}}}}",
                "if(\"requestIdleCallback\" in window){{window.requestIdleCallback(prefetch,{{timeout:{idle}}});}}",
                "else{{setTimeout(prefetch,{fallback});}}}})();"
            ),
            urls = urls,
            idle = PREFETCH_IDLE_TIMEOUT_MS,
            fallback = PREFETCH_FALLBACK_MS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_hints() {
        let hints = ImageHints::from_config(&CssConfig::default());
        assert_eq!(hints.critical, vec!["/images/banner.webp"]);
        assert_eq!(hints.prefetch.len(), 3);
    }

    #[test]
    fn test_preload_links() {
        let hints = ImageHints::new()
            .with_critical("/images/banner.webp")
            .with_critical("/images/a&b.webp");
        let html = hints.render_preload_links();
        assert_eq!(html.lines().count(), 2);
        assert!(html.contains(
            r#"<link rel="preload" as="image" href="/images/banner.webp" fetchpriority="high">"#
        ));
        assert!(html.contains("a&amp;b.webp"));
    }

    #[test]
    fn test_prefetch_script() {
        let hints = ImageHints::new().with_prefetch("/images/guru2024.webp");
        let script = hints.render_prefetch_script().unwrap();
        assert!(script.contains(r#"var urls=["/images/guru2024.webp"]"#));
        assert!(script.contains("link.rel=\"prefetch\""));
        assert!(script.contains("{timeout:2000}"));
        assert!(script.contains("setTimeout(prefetch,1000)"));
    }

    #[test]
    fn test_no_prefetch_script_when_empty() {
        assert!(ImageHints::new().render_prefetch_script().is_none());
    }
}
