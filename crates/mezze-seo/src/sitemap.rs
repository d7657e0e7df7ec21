//! XML sitemaps.

use chrono::{DateTime, SecondsFormat, Utc};
use mezze_core::SiteInfo;

use crate::xml::{encode_path, xml_escape};

pub const SITEMAP_PATH: &str = "/sitemap.xml";
pub const IMAGE_SITEMAP_PATH: &str = "/sitemap-images.xml";
pub const SITEMAP_CONTENT_TYPE: &str = "application/xml";
pub const SITEMAP_CACHE_CONTROL: &str = "public, max-age=3600, s-maxage=3600";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A page listed in the sitemap.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapPage {
    /// Site-relative path; `""` is the home page.
    pub path: String,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

impl SitemapPage {
    pub fn new(path: impl Into<String>, change_frequency: ChangeFrequency, priority: f32) -> Self {
        Self {
            path: path.into(),
            change_frequency,
            priority,
        }
    }
}

/// The static pages of the site.
pub fn standard_pages() -> Vec<SitemapPage> {
    use ChangeFrequency::*;
    vec![
        SitemapPage::new("", Daily, 1.0),
        SitemapPage::new("/menu", Weekly, 0.9),
        SitemapPage::new("/gallery", Weekly, 0.8),
        SitemapPage::new("/about", Monthly, 0.7),
        SitemapPage::new("/contact", Monthly, 0.7),
        SitemapPage::new("/reservations", Daily, 0.8),
        SitemapPage::new("/takeaway", Daily, 0.8),
        SitemapPage::new("/events-catering", Weekly, 0.6),
        SitemapPage::new("/blog", Daily, 0.6),
    ]
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn page_url(site: &SiteInfo, locale: Option<&str>, path: &str) -> String {
    let base = site.base_url.trim_end_matches('/');
    match locale {
        Some(locale) => format!("{}/{}{}", base, locale, encode_path(path)),
        None => format!("{}{}", base, encode_path(path)),
    }
}

/// Page sitemap with an alternate link per locale.
pub fn render_sitemap(site: &SiteInfo, pages: &[SitemapPage], now: DateTime<Utc>) -> String {
    let lastmod = timestamp(now);
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"\n",
        "        xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n"
    ));

    for page in pages {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            xml_escape(&page_url(site, None, &page.path))
        ));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            page.change_frequency.as_str()
        ));
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", page.priority));

        for locale in &site.locales {
            let prefix = (*locale != site.default_locale).then_some(locale.as_str());
            xml.push_str(&format!(
                "    <xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>\n",
                xml_escape(locale),
                xml_escape(&page_url(site, prefix, &page.path))
            ));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// An image entry in the image sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapImage {
    pub path: String,
    pub caption: String,
    pub title: String,
    pub geo_location: Option<String>,
}

impl SitemapImage {
    pub fn new(path: &str, caption: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            caption: caption.to_string(),
            title: title.to_string(),
            geo_location: None,
        }
    }

    pub fn with_geo_location(mut self, location: &str) -> Self {
        self.geo_location = Some(location.to_string());
        self
    }
}

/// A page and the images it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePage {
    pub path: String,
    pub images: Vec<SitemapImage>,
}

/// Images worth indexing, grouped by page.
pub fn standard_image_pages() -> Vec<ImagePage> {
    vec![
        ImagePage {
            path: "/".to_string(),
            images: vec![
                SitemapImage::new(
                    "/images/banner.webp",
                    "East @ West Lebanese Restaurant interior in Brussels",
                    "East @ West Restaurant",
                )
                .with_geo_location("Brussels, Belgium"),
                SitemapImage::new(
                    "/images/gallery/falafel.webp",
                    "Golden-fried chickpea fritters served with tahini sauce and fresh herbs",
                    "Traditional Lebanese Falafel",
                ),
                SitemapImage::new(
                    "/images/gallery/kebbe.webp",
                    "Traditional bulgur croquettes stuffed with seasoned minced beef and walnuts",
                    "Lebanese Kebbe",
                ),
            ],
        },
        ImagePage {
            path: "/menu".to_string(),
            images: vec![SitemapImage::new(
                "/images/gallery/mezze-selection.webp",
                "Traditional Lebanese mezze selection at East @ West",
                "Lebanese Mezze Platter",
            )],
        },
        ImagePage {
            path: "/gallery".to_string(),
            images: vec![
                SitemapImage::new(
                    "/images/gallery/aish el saraya.webp",
                    "Layered dessert with sweetened biscuits, vegan pudding, and orange blossom water",
                    "Aish el Saraya Dessert",
                ),
                SitemapImage::new(
                    "/images/gallery/houmos.webp",
                    "Traditional Lebanese hummus with olive oil and spices",
                    "Lebanese Hummus",
                ),
            ],
        },
        ImagePage {
            path: "/about".to_string(),
            images: vec![SitemapImage::new(
                "/images/about-us.webp",
                "East @ West Lebanese Restaurant team and story",
                "About East @ West Restaurant",
            )],
        },
    ]
}

/// Image sitemap using the Google image extension.
pub fn render_image_sitemap(site: &SiteInfo, pages: &[ImagePage], now: DateTime<Utc>) -> String {
    let lastmod = timestamp(now);
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"\n",
        "        xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\">\n"
    ));

    for page in pages {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            xml_escape(&page_url(site, None, &page.path))
        ));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));

        for image in &page.images {
            xml.push_str("    <image:image>\n");
            xml.push_str(&format!(
                "      <image:loc>{}</image:loc>\n",
                xml_escape(&page_url(site, None, &image.path))
            ));
            xml.push_str(&format!(
                "      <image:caption>{}</image:caption>\n",
                xml_escape(&image.caption)
            ));
            xml.push_str(&format!(
                "      <image:title>{}</image:title>\n",
                xml_escape(&image.title)
            ));
            if let Some(geo) = &image.geo_location {
                xml.push_str(&format!(
                    "      <image:geo_location>{}</image:geo_location>\n",
                    xml_escape(geo)
                ));
            }
            xml.push_str("    </image:image>\n");
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_standard_pages() {
        let pages = standard_pages();
        assert_eq!(pages.len(), 9);
        assert_eq!(pages[0].path, "");
        assert_eq!(pages[0].priority, 1.0);
        assert!(pages.iter().any(|p| p.path == "/events-catering"));
    }

    #[test]
    fn test_render_sitemap() {
        let xml = render_sitemap(&SiteInfo::default(), &standard_pages(), now());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert_eq!(xml.matches("<url>").count(), 9);
        assert!(xml.contains("<loc>https://eastatwest.com</loc>"));
        assert!(xml.contains("<loc>https://eastatwest.com/menu</loc>"));
        assert!(xml.contains("<lastmod>2024-06-01T08:30:00.000Z</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.9</priority>"));
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_sitemap_alternates() {
        let pages = vec![SitemapPage::new("/menu", ChangeFrequency::Weekly, 0.9)];
        let xml = render_sitemap(&SiteInfo::default(), &pages, now());
        assert!(xml.contains(
            r#"<xhtml:link rel="alternate" hreflang="en" href="https://eastatwest.com/menu"/>"#
        ));
        assert!(xml.contains(
            r#"<xhtml:link rel="alternate" hreflang="fr" href="https://eastatwest.com/fr/menu"/>"#
        ));
        assert!(xml.contains(
            r#"<xhtml:link rel="alternate" hreflang="nl" href="https://eastatwest.com/nl/menu"/>"#
        ));
    }

    #[test]
    fn test_sitemap_escapes_urls() {
        let pages = vec![SitemapPage::new("/a&b", ChangeFrequency::Daily, 0.5)];
        let xml = render_sitemap(&SiteInfo::default(), &pages, now());
        assert!(xml.contains("<loc>https://eastatwest.com/a&amp;b</loc>"));
        assert!(!xml.contains("/a&b"));
    }

    #[test]
    fn test_render_image_sitemap() {
        let xml = render_image_sitemap(&SiteInfo::default(), &standard_image_pages(), now());
        assert_eq!(xml.matches("<url>").count(), 4);
        assert_eq!(xml.matches("<image:image>").count(), 7);
        assert_eq!(xml.matches("<image:geo_location>").count(), 1);
        assert!(xml.contains(
            "<image:loc>https://eastatwest.com/images/gallery/aish%20el%20saraya.webp</image:loc>"
        ));
        assert!(xml.contains("<image:title>Lebanese Hummus</image:title>"));
    }

    #[test]
    fn test_image_sitemap_escapes_text() {
        let pages = vec![ImagePage {
            path: "/gallery".to_string(),
            images: vec![SitemapImage::new("/i.webp", "Bread & <butter>", "T")],
        }];
        let xml = render_image_sitemap(&SiteInfo::default(), &pages, now());
        assert!(xml.contains("<image:caption>Bread &amp; &lt;butter&gt;</image:caption>"));
    }
}
