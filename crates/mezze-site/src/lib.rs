//! The restaurant site, independent of the hosting runtime.
//!
//! This crate provides:
//! - `Site` - Routes a request that passed the middleware to a response
//! - `PageCatalog` - HTML page shells with critical CSS inlined
//! - `AssetStore` / `FsAssetStore` - Static files, precompressed when available
//! - `SupabaseIdentity` - `IdentityProvider` backed by Supabase Auth
//! - `AuthTransport` - Outbound HTTP seam for the identity backend

mod assets;
mod error;
mod pages;
mod router;
mod supabase;

pub use assets::*;
pub use error::*;
pub use pages::*;
pub use router::*;
pub use supabase::*;
