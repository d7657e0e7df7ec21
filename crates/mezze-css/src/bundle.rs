//! Critical and deferred stylesheet pair.

use std::sync::Arc;

/// Critical CSS shipped with the crate.
pub const EMBEDDED_CRITICAL_CSS: &str = include_str!("../assets/critical.css");

/// Deferred CSS source shipped with the crate.
pub const EMBEDDED_DEFERRED_CSS: &str = include_str!("../assets/deferred.css");

/// Above-the-fold CSS to inline in the document head, plus the remainder
/// that is served as a separate stylesheet.
///
/// Cheap to clone; both halves are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalCssBundle {
    critical: Arc<str>,
    deferred: Arc<str>,
}

impl CriticalCssBundle {
    pub fn new(critical: impl Into<Arc<str>>, deferred: impl Into<Arc<str>>) -> Self {
        Self {
            critical: critical.into(),
            deferred: deferred.into(),
        }
    }

    /// Bundle built from the stylesheets compiled into this crate.
    pub fn embedded() -> Self {
        Self::new(EMBEDDED_CRITICAL_CSS.trim_end(), EMBEDDED_DEFERRED_CSS)
    }

    /// CSS to inline in `<style>`.
    pub fn critical(&self) -> &str {
        &self.critical
    }

    /// CSS served at the deferred stylesheet URL.
    pub fn deferred(&self) -> &str {
        &self.deferred
    }

    /// Inline size in bytes.
    pub fn critical_len(&self) -> usize {
        self.critical.len()
    }

    /// Render the inline `<style>` element.
    ///
    /// A `</style` sequence inside the CSS would end the element early, so it
    /// is escaped.
    pub fn render_inline(&self) -> String {
        format!(
            "<style data-critical>{}</style>",
            self.critical.replace("</style", "<\\/style")
        )
    }
}

impl Default for CriticalCssBundle {
    fn default() -> Self {
        Self::embedded()
    }
}
