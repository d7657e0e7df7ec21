//! JSON-LD structured data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Anything that renders to a schema.org JSON-LD document.
pub trait JsonLd {
    fn to_json_ld(&self) -> Value;
}

/// Drop `null` members so absent optionals are omitted, recursively.
fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    /// Day names, e.g. `Monday`.
    pub days: Vec<String>,
    /// `HH:MM`.
    pub opens: String,
    pub closes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub value: f32,
    pub count: u32,
}

/// The restaurant itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSchema {
    pub name: String,
    pub description: String,
    pub url: String,
    pub images: Vec<String>,
    pub cuisine: Vec<String>,
    pub price_range: String,
    pub address: Option<PostalAddress>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub opening_hours: Vec<OpeningHours>,
    pub rating: Option<Rating>,
    pub awards: Vec<String>,
    pub languages: Vec<String>,
}

impl Default for RestaurantSchema {
    fn default() -> Self {
        Self {
            name: "East @ West".to_string(),
            description: "Authentic Lebanese restaurant in Brussels".to_string(),
            url: "https://eastatwest.com".to_string(),
            images: vec!["https://eastatwest.com/images/banner.webp".to_string()],
            cuisine: vec![
                "Lebanese".to_string(),
                "Mediterranean".to_string(),
                "Middle Eastern".to_string(),
            ],
            price_range: "€€".to_string(),
            address: None,
            phone: None,
            email: None,
            opening_hours: Vec::new(),
            rating: None,
            awards: Vec::new(),
            languages: vec!["en".to_string(), "fr".to_string(), "nl".to_string()],
        }
    }
}

impl RestaurantSchema {
    pub fn with_address(mut self, address: PostalAddress) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_opening_hours(mut self, hours: OpeningHours) -> Self {
        self.opening_hours.push(hours);
        self
    }

    pub fn with_rating(mut self, value: f32, count: u32) -> Self {
        self.rating = Some(Rating { value, count });
        self
    }

    pub fn with_award(mut self, award: impl Into<String>) -> Self {
        self.awards.push(award.into());
        self
    }
}

impl JsonLd for RestaurantSchema {
    fn to_json_ld(&self) -> Value {
        let url = self.url.trim_end_matches('/');
        let amenity = |name: &str| {
            json!({
                "@type": "LocationFeatureSpecification",
                "name": name,
                "value": true
            })
        };

        prune_nulls(json!({
            "@context": SCHEMA_CONTEXT,
            "@type": "Restaurant",
            "@id": format!("{}/#restaurant", url),
            "name": self.name,
            "description": self.description,
            "url": url,
            "image": self.images,
            "servesCuisine": self.cuisine,
            "priceRange": self.price_range,
            "currenciesAccepted": "EUR",
            "paymentAccepted": ["Cash", "Credit Card", "Debit Card", "Bancontact"],
            "address": self.address.as_ref().map(|a| json!({
                "@type": "PostalAddress",
                "streetAddress": a.street,
                "addressLocality": a.city,
                "addressRegion": a.region,
                "postalCode": a.postal_code,
                "addressCountry": a.country
            })),
            "telephone": self.phone,
            "email": self.email,
            "openingHoursSpecification": non_empty(&self.opening_hours).map(|hours| {
                hours
                    .iter()
                    .map(|h| json!({
                        "@type": "OpeningHoursSpecification",
                        "dayOfWeek": h.days,
                        "opens": h.opens,
                        "closes": h.closes
                    }))
                    .collect::<Vec<_>>()
            }),
            "aggregateRating": self.rating.map(|r| json!({
                "@type": "AggregateRating",
                "ratingValue": r.value,
                "reviewCount": r.count,
                "bestRating": 5,
                "worstRating": 1
            })),
            "award": non_empty(&self.awards),
            "hasMenu": {
                "@type": "Menu",
                "url": format!("{}/menu", url),
                "inLanguage": self.languages
            },
            "acceptsReservations": true,
            "amenityFeature": [
                amenity("Takeaway Available"),
                amenity("Catering Services"),
                amenity("Vegetarian Options")
            ]
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: Option<u32>,
    pub protein: Option<String>,
    pub carbs: Option<String>,
    pub fat: Option<String>,
}

/// One dish on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemSchema {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    /// Decimal string, e.g. `"8.50"`.
    pub price: String,
    pub currency: String,
    pub category: String,
    pub nutrition: Option<Nutrition>,
    pub allergens: Vec<String>,
    /// schema.org diet names without the `Diet` suffix, e.g. `Vegan`.
    pub dietary: Vec<String>,
}

impl MenuItemSchema {
    pub fn new(name: impl Into<String>, price: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            image: None,
            price: price.into(),
            currency: "EUR".to_string(),
            category: category.into(),
            nutrition: None,
            allergens: Vec::new(),
            dietary: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_diet(mut self, diet: impl Into<String>) -> Self {
        self.dietary.push(diet.into());
        self
    }

    pub fn with_allergen(mut self, allergen: impl Into<String>) -> Self {
        self.allergens.push(allergen.into());
        self
    }
}

impl JsonLd for MenuItemSchema {
    fn to_json_ld(&self) -> Value {
        prune_nulls(json!({
            "@context": SCHEMA_CONTEXT,
            "@type": "MenuItem",
            "name": self.name,
            "description": self.description,
            "image": self.image,
            "offers": {
                "@type": "Offer",
                "price": self.price,
                "priceCurrency": self.currency,
                "availability": "https://schema.org/InStock"
            },
            "menuAddOn": self.category,
            "nutrition": self.nutrition.as_ref().map(|n| json!({
                "@type": "NutritionInformation",
                "calories": n.calories,
                "proteinContent": n.protein,
                "carbohydrateContent": n.carbs,
                "fatContent": n.fat
            })),
            "suitableForDiet": non_empty(&self.dietary).map(|diets| {
                diets
                    .iter()
                    .map(|d| format!("https://schema.org/{}Diet", d))
                    .collect::<Vec<_>>()
            }),
            "allergens": non_empty(&self.allergens)
        }))
    }
}

/// A blog article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostSchema {
    pub title: String,
    pub description: String,
    pub author: String,
    /// ISO 8601 date.
    pub date_published: String,
    pub date_modified: Option<String>,
    pub image: Option<String>,
    pub url: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl JsonLd for BlogPostSchema {
    fn to_json_ld(&self) -> Value {
        prune_nulls(json!({
            "@context": SCHEMA_CONTEXT,
            "@type": "BlogPosting",
            "headline": self.title,
            "description": self.description,
            "author": {
                "@type": "Person",
                "name": self.author
            },
            "publisher": {
                "@type": "Organization",
                "name": "East @ West",
                "logo": {
                    "@type": "ImageObject",
                    "url": "https://eastatwest.com/images/logo.webp"
                }
            },
            "datePublished": self.date_published,
            "dateModified": self.date_modified.as_ref().unwrap_or(&self.date_published),
            "image": self.image,
            "url": self.url,
            "mainEntityOfPage": self.url,
            "articleSection": self.category,
            "keywords": non_empty(&self.tags).map(|tags| tags.join(", ")),
            "inLanguage": "en",
            "isPartOf": {
                "@type": "Blog",
                "name": "East @ West Blog",
                "url": "https://eastatwest.com/blog"
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Restaurant ===

    #[test]
    fn test_restaurant_defaults() {
        let doc = RestaurantSchema::default().to_json_ld();
        assert_eq!(doc["@context"], "https://schema.org");
        assert_eq!(doc["@type"], "Restaurant");
        assert_eq!(doc["@id"], "https://eastatwest.com/#restaurant");
        assert_eq!(doc["name"], "East @ West");
        assert_eq!(doc["priceRange"], "€€");
        assert_eq!(doc["servesCuisine"][0], "Lebanese");
        assert_eq!(doc["hasMenu"]["url"], "https://eastatwest.com/menu");
        assert_eq!(doc["amenityFeature"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_restaurant_omits_absent_fields() {
        let doc = RestaurantSchema::default().to_json_ld();
        let obj = doc.as_object().unwrap();
        for key in ["address", "telephone", "email", "aggregateRating", "award", "openingHoursSpecification"] {
            assert!(!obj.contains_key(key), "{key} should be omitted");
        }
    }

    #[test]
    fn test_restaurant_full() {
        let doc = RestaurantSchema::default()
            .with_address(PostalAddress {
                street: "Rue de la Paix 1".to_string(),
                city: "Brussels".to_string(),
                region: "Brussels-Capital".to_string(),
                postal_code: "1000".to_string(),
                country: "BE".to_string(),
            })
            .with_phone("+32 2 000 00 00")
            .with_opening_hours(OpeningHours {
                days: vec!["Tuesday".to_string(), "Wednesday".to_string()],
                opens: "12:00".to_string(),
                closes: "22:00".to_string(),
            })
            .with_rating(4.5, 120)
            .with_award("Restaurant Guru 2024")
            .to_json_ld();

        assert_eq!(doc["address"]["@type"], "PostalAddress");
        assert_eq!(doc["address"]["postalCode"], "1000");
        assert_eq!(doc["telephone"], "+32 2 000 00 00");
        assert_eq!(doc["openingHoursSpecification"][0]["dayOfWeek"][1], "Wednesday");
        assert_eq!(doc["aggregateRating"]["reviewCount"], 120);
        assert_eq!(doc["aggregateRating"]["bestRating"], 5);
        assert_eq!(doc["award"][0], "Restaurant Guru 2024");
    }

    // === Menu item ===

    #[test]
    fn test_menu_item() {
        let doc = MenuItemSchema::new("Falafel", "8.50", "Mezze")
            .with_description("Chickpea fritters")
            .with_diet("Vegan")
            .with_allergen("sesame")
            .to_json_ld();
        assert_eq!(doc["@type"], "MenuItem");
        assert_eq!(doc["offers"]["price"], "8.50");
        assert_eq!(doc["offers"]["priceCurrency"], "EUR");
        assert_eq!(doc["suitableForDiet"][0], "https://schema.org/VeganDiet");
        assert_eq!(doc["allergens"][0], "sesame");
        assert!(doc.get("nutrition").is_none());
        assert!(doc.get("image").is_none());
    }

    #[test]
    fn test_menu_item_partial_nutrition() {
        let mut item = MenuItemSchema::new("Houmos", "7.00", "Mezze");
        item.nutrition = Some(Nutrition {
            calories: Some(320),
            ..Default::default()
        });
        let doc = item.to_json_ld();
        assert_eq!(doc["nutrition"]["calories"], 320);
        assert!(doc["nutrition"].get("fatContent").is_none());
    }

    // === Blog post ===

    #[test]
    fn test_blog_post_modified_defaults_to_published() {
        let post = BlogPostSchema {
            title: "Mezze 101".to_string(),
            description: "A guide".to_string(),
            author: "Chef".to_string(),
            date_published: "2024-03-01".to_string(),
            date_modified: None,
            image: None,
            url: "https://eastatwest.com/blog/mezze-101".to_string(),
            category: None,
            tags: vec!["mezze".to_string(), "lebanese".to_string()],
        };
        let doc = post.to_json_ld();
        assert_eq!(doc["dateModified"], "2024-03-01");
        assert_eq!(doc["keywords"], "mezze, lebanese");
        assert_eq!(doc["mainEntityOfPage"], doc["url"]);
        assert!(doc.get("articleSection").is_none());
    }
}
