use crate::monitor::constants::VALID_LOG_LEVELS;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Case-insensitive check against the levels accepted on the command line
pub fn is_valid_log_level(level: &str) -> bool {
    VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str())
}

/// Initialize structured logging on stderr.
///
/// `RUST_LOG` takes precedence over `level` when set. Examples:
/// - `RUST_LOG=debug` - Debug level and above
/// - `RUST_LOG=jitterscope=debug` - Debug level for this crate only
pub fn init_logging_with_config(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        assert!(is_valid_log_level("warn"));
        assert!(is_valid_log_level("DEBUG"));
        assert!(!is_valid_log_level("verbose"));
        assert!(!is_valid_log_level(""));
    }
}
