//! Caching infrastructure for the restaurant site edge platform.
//!
//! This crate provides:
//! - `PolicyTable` - Prioritised path-pattern to `CachePolicy` rules
//! - `generate_headers` - Cache-Control, Vary, ETag and Content-Type for a path
//! - `HeaderSet` - Ordered, case-insensitive response header map
//! - `detect_encoding` - Accept-Encoding negotiation (brotli over gzip)
//! - `compress` / `precompress` - Runtime and build-time body compression
//!
//! # Example
//!
//! ```ignore
//! use mezze_cache::{generate_headers, PolicyTable};
//!
//! let table = PolicyTable::standard()?;
//! let headers = generate_headers(&table, "/assets/restaurant-guru/star_red.svg");
//! assert_eq!(headers.get("Content-Type"), Some("image/svg+xml"));
//! ```

mod compression;
mod error;
mod headers;
mod policy;

pub use compression::*;
pub use error::*;
pub use headers::*;
pub use policy::*;
