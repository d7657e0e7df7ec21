//! Observability infrastructure for the restaurant site edge platform.
//!
//! This crate provides:
//! - `StructuredLogger` - Request-scoped structured logging routed through `tracing`
//! - `init_tracing` - Subscriber setup for workloads and the CLI

mod logging;
mod subscriber;

pub use logging::*;
pub use subscriber::*;

// Re-export RequestId from mezze-core for convenience
pub use mezze_core::RequestId;
