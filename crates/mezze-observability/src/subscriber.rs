//! Tracing subscriber setup.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::logging::LogFormat;

/// Install a global subscriber writing to stderr (Spin captures this).
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice
/// returns an error instead of panicking.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Human => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let _ = init_tracing(LogFormat::Human, "warn");
        assert!(init_tracing(LogFormat::Human, "warn").is_err());
    }
}
