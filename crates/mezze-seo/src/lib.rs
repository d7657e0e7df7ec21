//! Search-engine facing content.
//!
//! This crate provides:
//! - `RestaurantSchema`, `MenuItemSchema`, `BlogPostSchema` - JSON-LD documents
//! - `render_sitemap` / `render_image_sitemap` - XML sitemaps
//! - `breadcrumbs` / `breadcrumb_schema` - Path-derived navigation trail

mod breadcrumbs;
mod schema;
mod sitemap;
mod xml;

pub use breadcrumbs::*;
pub use schema::*;
pub use sitemap::*;
pub use xml::xml_escape;
