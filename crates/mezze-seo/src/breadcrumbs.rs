//! Path-derived breadcrumb trail.

use std::collections::HashMap;

use serde_json::{json, Value};

/// One step of the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub href: String,
}

/// Display labels for known path segments.
#[derive(Debug, Clone)]
pub struct BreadcrumbLabels {
    home: String,
    segments: HashMap<String, String>,
}

impl BreadcrumbLabels {
    pub fn new(home: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            segments: HashMap::new(),
        }
    }

    pub fn with_label(mut self, segment: &str, label: &str) -> Self {
        self.segments.insert(segment.to_string(), label.to_string());
        self
    }

    /// Label for `segment`: the mapped label, else the segment capitalised
    /// with hyphens turned into spaces.
    pub fn label_for(&self, segment: &str) -> String {
        if let Some(label) = self.segments.get(segment) {
            return label.clone();
        }
        let spaced = segment.replace('-', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Default for BreadcrumbLabels {
    fn default() -> Self {
        Self::new("Home")
            .with_label("menu", "Menu")
            .with_label("gallery", "Gallery")
            .with_label("about", "About Us")
            .with_label("contact", "Contact")
            .with_label("reservations", "Reservations")
            .with_label("takeaway", "Takeaway")
            .with_label("events-catering", "Events & Catering")
            .with_label("blog", "Blog")
            .with_label("admin", "Admin")
            .with_label("checkout", "Checkout")
            .with_label("payment", "Payment")
            .with_label("success", "Success")
            .with_label("comments", "Comments")
    }
}

fn is_dynamic(segment: &str) -> bool {
    segment.starts_with('[') && segment.ends_with(']')
}

/// Trail for `path`. Empty on the home page.
///
/// Dynamic `[param]` segments get no crumb of their own but still extend the
/// href of later segments.
pub fn breadcrumbs(path: &str, labels: &BreadcrumbLabels) -> Vec<Crumb> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Vec::new();
    }

    let mut crumbs = vec![Crumb {
        label: labels.home.clone(),
        href: "/".to_string(),
    }];
    let mut href = String::new();
    for segment in segments {
        href.push('/');
        href.push_str(segment);
        if is_dynamic(segment) {
            continue;
        }
        crumbs.push(Crumb {
            label: labels.label_for(segment),
            href: href.clone(),
        });
    }
    crumbs
}

/// `BreadcrumbList` JSON-LD for a trail.
pub fn breadcrumb_schema(base_url: &str, crumbs: &[Crumb]) -> Value {
    let base = base_url.trim_end_matches('/');
    let items: Vec<Value> = crumbs
        .iter()
        .enumerate()
        .map(|(index, crumb)| {
            let item = if crumb.href == "/" {
                base.to_string()
            } else {
                format!("{}{}", base, crumb.href)
            };
            json!({
                "@type": "ListItem",
                "position": index + 1,
                "name": crumb.label,
                "item": item
            })
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/")]
    #[case("")]
    fn test_home_has_no_breadcrumbs(#[case] path: &str) {
        assert!(breadcrumbs(path, &BreadcrumbLabels::default()).is_empty());
    }

    #[test]
    fn test_mapped_labels() {
        let crumbs = breadcrumbs("/events-catering", &BreadcrumbLabels::default());
        assert_eq!(
            crumbs,
            vec![
                Crumb { label: "Home".to_string(), href: "/".to_string() },
                Crumb { label: "Events & Catering".to_string(), href: "/events-catering".to_string() },
            ]
        );
    }

    #[rstest]
    #[case("mezze-platters", "Mezze platters")]
    #[case("faq", "Faq")]
    #[case("été", "Été")]
    fn test_fallback_label(#[case] segment: &str, #[case] expected: &str) {
        assert_eq!(BreadcrumbLabels::default().label_for(segment), expected);
    }

    #[test]
    fn test_nested_path_hrefs() {
        let crumbs = breadcrumbs("/blog/lebanese-bread/comments", &BreadcrumbLabels::default());
        let hrefs: Vec<_> = crumbs.iter().map(|c| c.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/", "/blog", "/blog/lebanese-bread", "/blog/lebanese-bread/comments"]);
        assert_eq!(crumbs[2].label, "Lebanese bread");
    }

    #[test]
    fn test_dynamic_segments_skipped() {
        let crumbs = breadcrumbs("/blog/[slug]/comments", &BreadcrumbLabels::default());
        assert_eq!(crumbs.len(), 3);
        assert_eq!(crumbs[2].href, "/blog/[slug]/comments");
    }

    #[test]
    fn test_custom_labels() {
        let labels = BreadcrumbLabels::new("Accueil").with_label("menu", "Carte");
        let crumbs = breadcrumbs("/menu", &labels);
        assert_eq!(crumbs[0].label, "Accueil");
        assert_eq!(crumbs[1].label, "Carte");
    }

    #[test]
    fn test_breadcrumb_schema() {
        let crumbs = breadcrumbs("/gallery", &BreadcrumbLabels::default());
        let doc = breadcrumb_schema("https://eastatwest.com", &crumbs);
        assert_eq!(doc["@type"], "BreadcrumbList");
        let items = doc["itemListElement"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["position"], 1);
        assert_eq!(items[0]["item"], "https://eastatwest.com");
        assert_eq!(items[1]["name"], "Gallery");
        assert_eq!(items[1]["item"], "https://eastatwest.com/gallery");
    }
}
