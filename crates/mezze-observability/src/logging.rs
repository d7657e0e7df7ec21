//! Request-scoped structured logging.
//!
//! A `StructuredLogger` stamps every entry with the request ID, workload,
//! route and time since the request arrived, then hands it to `tracing`.
//! The subscriber installed by [`crate::init_tracing`] decides the output
//! format.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use mezze_core::{PhaseObserver, RequestId, RequestPhase};
use serde::Serialize;

/// Output format for the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation.
    #[default]
    Json,
    /// Compact text for terminals.
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Entry-specific fields, kept sorted so output is stable.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Microseconds since the logger was created.
    pub elapsed_us: u64,
}

impl LogEntry {
    /// Entry fields as `key=value` pairs.
    pub fn fields_text(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{}={}", key, s),
                other => format!("{}={}", key, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Logger bound to one request.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    workload: Option<String>,
    route: Option<String>,
    started: Instant,
}

impl StructuredLogger {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            workload: None,
            route: None,
            started: Instant::now(),
        }
    }

    pub fn with_workload(mut self, workload: impl Into<String>) -> Self {
        self.workload = Some(workload.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn debug(&self, message: &str) {
        self.debug_builder(message).emit();
    }

    /// Log the phase a middleware run finished in.
    pub fn phase(&self, phase: RequestPhase) {
        self.debug_builder("middleware finished")
            .field("phase", phase.as_str())
            .emit();
    }

    pub fn debug_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Debug, message)
    }

    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Info, message)
    }

    pub fn warn_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Warn, message)
    }

    pub fn error_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Error, message)
    }

    fn entry(
        &self,
        level: LogLevel,
        message: String,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> LogEntry {
        LogEntry {
            level,
            message,
            request_id: self.request_id.to_string(),
            workload: self.workload.clone(),
            route: self.route.clone(),
            fields,
            elapsed_us: self.started.elapsed().as_micros() as u64,
        }
    }
}

/// Emit `entry` as a `tracing` event at its level.
fn dispatch(entry: &LogEntry) {
    macro_rules! event {
        ($level:expr) => {
            tracing::event!(
                $level,
                request_id = %entry.request_id,
                workload = entry.workload.as_deref().unwrap_or_default(),
                route = entry.route.as_deref().unwrap_or_default(),
                elapsed_us = entry.elapsed_us,
                fields = %entry.fields_text(),
                "{}",
                entry.message
            )
        };
    }

    match entry.level {
        LogLevel::Debug => event!(tracing::Level::DEBUG),
        LogLevel::Info => event!(tracing::Level::INFO),
        LogLevel::Warn => event!(tracing::Level::WARN),
        LogLevel::Error => event!(tracing::Level::ERROR),
    }
}

/// Fluent builder for one entry.
pub struct LogBuilder<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'a> LogBuilder<'a> {
    fn new(logger: &'a StructuredLogger, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), serde_json::Value::String(value.into()));
        self
    }

    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn duration_ms(mut self, key: &str, duration: Duration) -> Self {
        self.fields
            .insert(key.to_string(), (duration.as_millis() as u64).into());
        self
    }

    pub fn build(self) -> LogEntry {
        self.logger.entry(self.level, self.message, self.fields)
    }

    pub fn emit(self) {
        dispatch(&self.build());
    }
}

impl PhaseObserver for StructuredLogger {
    fn on_phase(&self, phase: RequestPhase, elapsed: Duration) {
        self.debug_builder("middleware phase")
            .field("phase", phase.as_str())
            .duration_ms("phase_elapsed_ms", elapsed)
            .emit();
    }
}
