//! Render-blocking-free stylesheet delivery.
//!
//! This crate provides:
//! - `CriticalCssBundle` - Inline critical CSS plus the deferred remainder
//! - `DeferredCssLoader` - One-shot idle/interaction/timer load protocol
//! - `render_bootstrap_script` - The same protocol as a browser script
//! - `ImageHints` - High-priority preloads and idle-time prefetches
//! - `HeadContent` / `Shell` - Document shell with everything inlined
//! - `CssCompiler` - Build-time prefixing and minification

mod bootstrap;
mod bundle;
mod compiler;
mod error;
mod head;
mod preload;

pub use bootstrap::*;
pub use bundle::*;
pub use compiler::*;
pub use error::*;
pub use head::*;
pub use preload::*;
