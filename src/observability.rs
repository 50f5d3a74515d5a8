//! Structured logging setup, carried over from the teacher's
//! `init_logging` almost unchanged: a JSON file layer plus a
//! human-readable console layer, both filtered by `RUST_LOG` (falling
//! back to the configured level).
//!
//! SECURITY: nothing in this crate ever logs key material. `CoreError`'s
//! `Display` only carries `kind`/`component`/`scope`/`message`, and
//! `CryptoFacade`'s boundary logs carry only the operation name, the
//! scope, and (on failure) the error kind — never key bytes.

use crate::config::LoggingConfig;
use crate::error::{CoreError, ErrorKind, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Must be kept alive for the life of the process; dropping it stops the
/// background log-flushing thread.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            return Err(CoreError::new(
                ErrorKind::StoreFailure,
                format!("unrecognized log level {other}"),
                "observability",
                "-",
            ))
        }
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::new(
                    ErrorKind::StoreFailure,
                    format!("failed to create log directory {}: {e}", dir.display()),
                    "observability",
                    "-",
                )
            })?;
            let file_appender = tracing_appender::rolling::daily(dir, "tenant-keyvault");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(console_layer).init();
            Ok(None)
        }
    }
}
