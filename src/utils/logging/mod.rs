//! Logging setup driven by environment variables.
//!
//! Environment variables used:
//! - LOG_MODE: "stdout" (default) or "file"
//! - LOG_LEVEL: log level ("trace", "debug", "info", "warn", "error"); default is "info"
//! - LOG_DATA_DIR: directory for log files; default is "logs/"

pub mod error;

use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Sets up the global tracing subscriber.
///
/// Returns a guard that must be held for the lifetime of the process when
/// logging to a file; dropping it flushes and stops the background writer.
pub fn setup_logging() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
	let log_mode = env::var("LOG_MODE").unwrap_or_else(|_| "stdout".to_string());
	let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

	let env_filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	if log_mode.eq_ignore_ascii_case("file") {
		let log_dir = env::var("LOG_DATA_DIR").unwrap_or_else(|_| "logs".to_string());
		std::fs::create_dir_all(&log_dir)?;

		let appender = tracing_appender::rolling::daily(&log_dir, "dispatcher.log");
		let (writer, guard) = tracing_appender::non_blocking(appender);

		tracing_subscriber::registry()
			.with(env_filter)
			.with(
				fmt::layer()
					.with_target(true)
					.with_ansi(false)
					.compact()
					.with_writer(writer),
			)
			.try_init()?;

		Ok(Some(guard))
	} else {
		tracing_subscriber::registry()
			.with(env_filter)
			.with(fmt::layer().with_target(true).compact())
			.try_init()?;

		Ok(None)
	}
}

/// Masks a credential for startup banner logging.
///
/// Shows the first and last four characters of keys long enough to keep that
/// safe, and a fixed mask otherwise.
pub fn mask_credential(key: &str) -> String {
	if key.is_empty() {
		return "not set".to_string();
	}
	if key.len() <= 8 {
		return "****".to_string();
	}
	format!("{}...{}", &key[..4], &key[key.len() - 4..])
}
