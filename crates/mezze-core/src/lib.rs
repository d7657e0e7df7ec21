//! Core abstractions for the restaurant site edge platform.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `RequestContext` - Typed request parameters, headers and cookies
//! - `RequestPhase` - Middleware phase tracking with `TimingContext`
//! - `SiteConfig` - Site, route, CSS, identity and mail configuration
//! - `ConfigError` - Configuration loading and validation failures

mod config;
mod context;
mod error;
mod lifecycle;

pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
