//! Document shell with inlined critical resources.

use mezze_core::CssConfig;

use crate::bootstrap::render_bootstrap_script;
use crate::bundle::CriticalCssBundle;
use crate::preload::ImageHints;

/// Escape text for use inside a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Head content for the shell.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// `name` meta tags.
    pub meta: Vec<(String, String)>,
    /// `property` meta tags (Open Graph).
    pub properties: Vec<(String, String)>,
    /// Link tags and inline styles, in document order.
    pub links: Vec<String>,
    /// Inline scripts in head.
    pub scripts: Vec<String>,
    /// Serialized JSON-LD documents.
    pub json_ld: Vec<String>,
    /// Markup rendered inside `<noscript>`.
    pub noscript: Vec<String>,
}

impl HeadContent {
    /// Create new head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    pub fn with_property(mut self, property: &str, content: &str) -> Self {
        self.properties
            .push((property.to_string(), content.to_string()));
        self
    }

    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.push(format!(
            r#"<link rel="{}" href="{}">"#,
            escape_attr(rel),
            escape_attr(href)
        ));
        self
    }

    /// Alternate-language link.
    pub fn with_alternate(mut self, hreflang: &str, href: &str) -> Self {
        self.links.push(format!(
            r#"<link rel="alternate" hreflang="{}" href="{}">"#,
            escape_attr(hreflang),
            escape_attr(href)
        ));
        self
    }

    /// Add inline CSS.
    pub fn with_style(mut self, css: &str) -> Self {
        self.links
            .push(format!("<style>{}</style>", css.replace("</style", "<\\/style")));
        self
    }

    pub fn with_script(mut self, js: impl Into<String>) -> Self {
        self.scripts.push(js.into());
        self
    }

    pub fn with_json_ld(mut self, value: &serde_json::Value) -> Self {
        self.json_ld.push(value.to_string());
        self
    }

    /// Inline the critical CSS.
    pub fn with_critical_css(mut self, bundle: &CriticalCssBundle) -> Self {
        self.links.push(bundle.render_inline());
        self
    }

    /// Deferred-stylesheet bootstrap plus a `<noscript>` link for clients
    /// without scripting.
    pub fn with_css_bootstrap(mut self, config: &CssConfig) -> Self {
        self.scripts.push(render_bootstrap_script(config));
        self.noscript.push(format!(
            r#"<link rel="stylesheet" href="{}">"#,
            escape_attr(&config.deferred_href)
        ));
        self
    }

    pub fn with_image_hints(mut self, hints: &ImageHints) -> Self {
        let preload = hints.render_preload_links();
        if !preload.is_empty() {
            self.links.push(preload);
        }
        if let Some(script) = hints.render_prefetch_script() {
            self.scripts.push(script);
        }
        self
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = String::from("<meta charset=\"utf-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_attr(title)));
        }

        for (name, content) in &self.meta {
            html.push_str(&format!(
                "<meta name=\"{}\" content=\"{}\">\n",
                escape_attr(name),
                escape_attr(content)
            ));
        }

        for (property, content) in &self.properties {
            html.push_str(&format!(
                "<meta property=\"{}\" content=\"{}\">\n",
                escape_attr(property),
                escape_attr(content)
            ));
        }

        for link in &self.links {
            html.push_str(link);
            html.push('\n');
        }

        for doc in &self.json_ld {
            html.push_str(&format!(
                "<script type=\"application/ld+json\">{}</script>\n",
                doc.replace("</", "<\\/")
            ));
        }

        for script in &self.scripts {
            html.push_str(&format!("<script>{}</script>\n", script));
        }

        if !self.noscript.is_empty() {
            html.push_str("<noscript>");
            html.push_str(&self.noscript.concat());
            html.push_str("</noscript>\n");
        }

        html
    }
}

/// Page shell around the body content.
#[derive(Debug, Clone)]
pub struct Shell {
    /// Include doctype declaration.
    pub doctype: bool,
    /// `lang` attribute of `<html>`.
    pub lang: String,
    pub head: HeadContent,
    /// HTML before the content (opening body, wrapper divs, etc.).
    pub body_start: String,
    /// HTML after the content (closing tags).
    pub body_end: String,
}

impl Shell {
    pub fn new(head: HeadContent) -> Self {
        Self {
            doctype: true,
            lang: "en".to_string(),
            head,
            body_start: "<body>\n<main>\n".to_string(),
            body_end: "</main>\n</body>\n</html>".to_string(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_body_start(mut self, html: impl Into<String>) -> Self {
        self.body_start = html.into();
        self
    }

    pub fn with_body_end(mut self, html: impl Into<String>) -> Self {
        self.body_end = html.into();
        self
    }

    /// Render everything up to the content.
    pub fn render_opening(&self) -> String {
        let mut html = String::new();

        if self.doctype {
            html.push_str("<!DOCTYPE html>\n");
        }

        html.push_str(&format!("<html lang=\"{}\">\n<head>\n", escape_attr(&self.lang)));
        html.push_str(&self.head.render());
        html.push_str("</head>\n");
        html.push_str(&self.body_start);

        html
    }

    pub fn render_closing(&self) -> String {
        self.body_end.clone()
    }

    /// Render a complete document around `content`.
    pub fn render(&self, content: &str) -> String {
        let mut html = self.render_opening();
        html.push_str(content);
        html.push_str(&self.render_closing());
        html
    }
}
