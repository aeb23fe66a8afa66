//! Tracing subscriber setup
//!
//! Shared tracing configuration used by the CLI and by tests that want
//! log output.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `default_level` when unset or invalid.
pub fn env_filter(default_level: tracing::Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Initialize the global tracing subscriber.
///
/// Logs go to `log_file_path` when given, otherwise to stderr so that stdout
/// stays clean for command output. Returns false if a subscriber was already
/// installed or the log file could not be created.
pub fn init_global(log_file_path: Option<&Path>, default_level: tracing::Level) -> bool {
    let filter = env_filter(default_level);

    match log_file_path {
        Some(path) => {
            let Ok(log_file) = File::create(path) else {
                return false;
            };
            build_subscriber(log_file, filter).try_init().is_ok()
        }
        None => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
            .is_ok(),
    }
}

/// Build a subscriber writing to `log_file`.
pub fn build_subscriber(
    log_file: File,
    filter: EnvFilter,
) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_subscriber_writes_events() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap(), EnvFilter::new("info"));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("registered grammar keel");
            tracing::debug!("filtered out");
        });

        let content = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(content.contains("registered grammar keel"), "{}", content);
        assert!(!content.contains("filtered out"), "{}", content);
    }
}
