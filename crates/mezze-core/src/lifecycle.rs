//! Request lifecycle tracking.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Phases a request passes through in the middleware, strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestPhase {
    /// Request received, nothing consulted yet.
    Start,
    /// Identity collaborator consulted, cookie mutations forwarded.
    AuthRefreshed,
    /// Redirect rules evaluated without short-circuiting.
    RouteChecked,
    /// Cache and compression headers merged onto the response.
    HeadersApplied,
    /// Response handed back to the platform.
    Done,
}

impl RequestPhase {
    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::AuthRefreshed),
            Self::AuthRefreshed => Some(Self::RouteChecked),
            Self::RouteChecked => Some(Self::HeadersApplied),
            Self::HeadersApplied => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Stable name used for timing marks and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AuthRefreshed => "auth_refreshed",
            Self::RouteChecked => "route_checked",
            Self::HeadersApplied => "headers_applied",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Record that a phase was reached.
    pub fn mark_phase(&mut self, phase: RequestPhase) {
        self.mark(phase.as_str());
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time from request start to the given mark.
    pub fn time_to(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Time from request start to the given phase.
    pub fn time_to_phase(&self, phase: RequestPhase) -> Option<Duration> {
        self.time_to(phase.as_str())
    }

    /// Whether a mark has been recorded.
    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.contains_key(name)
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer trait for middleware phase transitions.
pub trait PhaseObserver: Send + Sync {
    /// Called when a phase is reached.
    fn on_phase(&self, phase: RequestPhase, elapsed: Duration);
}
