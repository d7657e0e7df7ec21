//! HTML page shells.

use mezze_core::{CssConfig, SiteConfig, SiteInfo};
use mezze_css::{escape_attr, CriticalCssBundle, HeadContent, ImageHints, Shell};
use mezze_seo::{breadcrumb_schema, breadcrumbs, BreadcrumbLabels, JsonLd, RestaurantSchema};

/// Static description of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Path without locale prefix; `/` for home.
    pub path: String,
    pub title: String,
    pub description: String,
    /// Excluded from search indexing.
    pub private: bool,
}

impl PageMeta {
    pub fn new(path: &str, title: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            private: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

fn standard_page_meta() -> Vec<PageMeta> {
    vec![
        PageMeta::new("/", "Lebanese Restaurant in Brussels", "Authentic Lebanese mezze, grills and desserts in the heart of Brussels."),
        PageMeta::new("/menu", "Menu", "Hot and cold mezze, grills, vegetarian dishes and Lebanese desserts."),
        PageMeta::new("/gallery", "Gallery", "Dishes and moments from our kitchen and dining room."),
        PageMeta::new("/about", "About Us", "The family and the story behind East @ West."),
        PageMeta::new("/contact", "Contact", "Address, opening hours and how to reach us."),
        PageMeta::new("/reservations", "Reservations", "Book a table for lunch or dinner."),
        PageMeta::new("/takeaway", "Takeaway", "Order your favourite dishes to take home."),
        PageMeta::new("/events-catering", "Events & Catering", "Lebanese catering for private and corporate events."),
        PageMeta::new("/blog", "Blog", "Recipes, stories and news from East @ West."),
        PageMeta::new("/login", "Sign In", "Sign in to your account.").private(),
        PageMeta::new("/dashboard", "Dashboard", "Your reservations and orders.").private(),
    ]
}

/// Page lookup and rendering.
#[derive(Debug, Clone)]
pub struct PageCatalog {
    site: SiteInfo,
    css: CssConfig,
    bundle: CriticalCssBundle,
    labels: BreadcrumbLabels,
    pages: Vec<PageMeta>,
}

impl PageCatalog {
    pub fn new(config: &SiteConfig, bundle: CriticalCssBundle) -> Self {
        Self {
            site: config.site.clone(),
            css: config.css.clone(),
            bundle,
            labels: BreadcrumbLabels::default(),
            pages: standard_page_meta(),
        }
    }

    pub fn with_page(mut self, page: PageMeta) -> Self {
        self.pages.retain(|p| p.path != page.path);
        self.pages.push(page);
        self
    }

    pub fn with_labels(mut self, labels: BreadcrumbLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn bundle(&self) -> &CriticalCssBundle {
        &self.bundle
    }

    /// Split a non-default locale prefix off `path`.
    pub fn split_locale<'a>(&'a self, path: &'a str) -> (&'a str, &'a str) {
        for locale in &self.site.locales {
            if *locale == self.site.default_locale {
                continue;
            }
            if let Some(rest) = path.strip_prefix('/').and_then(|p| p.strip_prefix(locale.as_str())) {
                if rest.is_empty() {
                    return (locale.as_str(), "/");
                }
                if rest.starts_with('/') {
                    return (locale.as_str(), rest);
                }
            }
        }
        (self.site.default_locale.as_str(), path)
    }

    pub fn find(&self, path: &str) -> Option<&PageMeta> {
        let (_, path) = self.split_locale(path);
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        self.pages.iter().find(|p| p.path == path)
    }

    fn localized_url(&self, locale: &str, path: &str) -> String {
        let path = if path == "/" { "" } else { path };
        if locale == self.site.default_locale {
            self.site.absolute_url(path)
        } else {
            self.site.absolute_url(&format!("/{}{}", locale, path))
        }
    }

    fn head(&self, page: &PageMeta, locale: &str) -> HeadContent {
        let title = if page.path == "/" {
            format!("{} | {}", self.site.name, page.title)
        } else {
            format!("{} | {}", page.title, self.site.name)
        };

        let mut head = HeadContent::new(&title)
            .with_meta("description", &page.description)
            .with_property("og:title", &title)
            .with_property("og:description", &page.description)
            .with_property("og:site_name", &self.site.name)
            .with_link("canonical", &self.localized_url(locale, &page.path));

        if page.private {
            head = head.with_meta("robots", "noindex, nofollow");
        } else {
            for alternate in &self.site.locales {
                head = head.with_alternate(alternate, &self.localized_url(alternate, &page.path));
            }
        }

        head = head
            .with_critical_css(&self.bundle)
            .with_image_hints(&ImageHints::from_config(&self.css))
            .with_css_bootstrap(&self.css);

        if page.path == "/" {
            let restaurant = RestaurantSchema {
                name: self.site.name.clone(),
                url: self.site.base_url.clone(),
                languages: self.site.locales.clone(),
                ..RestaurantSchema::default()
            };
            head = head.with_json_ld(&restaurant.to_json_ld());
        }

        let crumbs = breadcrumbs(&page.path, &self.labels);
        if !crumbs.is_empty() {
            head = head.with_json_ld(&breadcrumb_schema(&self.site.base_url, &crumbs));
        }
        head
    }

    fn body(&self, page: &PageMeta) -> String {
        let mut html = format!(
            "<header class=\"header-bg flex items-center justify-center\"><h1 class=\"lcp-text text-center\">{}</h1></header>\n",
            escape_attr(&page.title)
        );

        let crumbs = breadcrumbs(&page.path, &self.labels);
        if !crumbs.is_empty() {
            html.push_str("<nav class=\"breadcrumbs container\" aria-label=\"Breadcrumb navigation\"><ol>");
            let last = crumbs.len() - 1;
            for (index, crumb) in crumbs.iter().enumerate() {
                if index == last {
                    html.push_str(&format!(
                        "<li><span aria-current=\"page\">{}</span></li>",
                        escape_attr(&crumb.label)
                    ));
                } else {
                    html.push_str(&format!(
                        "<li><a href=\"{}\">{}</a></li>",
                        escape_attr(&crumb.href),
                        escape_attr(&crumb.label)
                    ));
                }
            }
            html.push_str("</ol></nav>\n");
        }

        html.push_str(&format!(
            "<section class=\"container py-8\"><p>{}</p></section>\n",
            escape_attr(&page.description)
        ));
        html
    }

    /// Full document for `path`, if it names a page.
    pub fn render(&self, path: &str) -> Option<String> {
        let (locale, _) = self.split_locale(path);
        let page = self.find(path)?;
        let shell = Shell::new(self.head(page, locale)).with_lang(locale);
        Some(shell.render(&self.body(page)))
    }

    /// Document for an unknown path.
    pub fn render_not_found(&self) -> String {
        let page = PageMeta::new("/404", "Page Not Found", "The page you are looking for does not exist.")
            .private();
        let head = HeadContent::new(format!("{} | {}", page.title, self.site.name))
            .with_meta("robots", "noindex")
            .with_critical_css(&self.bundle)
            .with_css_bootstrap(&self.css);
        Shell::new(head).render(&format!(
            "<section class=\"container py-8 text-center\"><h1 class=\"text-4xl font-bold mb-4\">{}</h1><p><a href=\"/\">Back to home</a></p></section>\n",
            escape_attr(&page.title)
        ))
    }
}
