//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output. Logs go
//! to stderr; stdout is reserved for records written with `--stdout`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter directive when RUST_LOG is unset
    pub level: &'static str,
    pub json: bool,
}

/// Combine the config file's logging section with CLI overrides.
///
/// `--verbose` forces at least debug; an explicit `trace` in the config is kept.
pub fn resolve(
    config: &folio_core::config::LoggingConfig,
    verbose: bool,
    json_logs: bool,
) -> LogSettings {
    let level = match config.level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        _ if verbose => "debug",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    LogSettings {
        level,
        json: json_logs || config.format.eq_ignore_ascii_case("json"),
    }
}

/// Initialize the logging subsystem.
///
/// The RUST_LOG environment variable overrides `settings.level`.
pub fn init(settings: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.level));

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the loaded configuration plus CLI flags.
pub fn init_from_config(config: &folio_core::Config, verbose: bool, json_logs: bool) {
    init(&resolve(&config.logging, verbose, json_logs));
}
