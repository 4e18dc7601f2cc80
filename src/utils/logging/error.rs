//! Structured error context shared by all service error types.
//!
//! Every error enum in this crate wraps an [`ErrorContext`]: a message plus an
//! optional source error, optional key/value metadata, a timestamp and a trace
//! id. The trace id is propagated through error chains so a failure can be
//! followed across service boundaries in the logs.

use chrono::Utc;
use std::{collections::HashMap, fmt};
use uuid::Uuid;

/// A context wrapper for errors with additional metadata.
///
/// Implements both `Display` and `std::error::Error`, so it can sit anywhere
/// in an error chain.
#[derive(Debug)]
pub struct ErrorContext {
	/// The error message
	pub message: String,
	/// The source error that caused this error
	pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
	/// Additional metadata about the error
	pub metadata: Option<HashMap<String, String>>,
	/// The timestamp of the error in RFC 3339 format
	pub timestamp: String,
	/// The unique identifier for the error (UUID v4)
	pub trace_id: String,
}

impl ErrorContext {
	/// Creates a new error context.
	///
	/// If the source error carries a trace id of its own, that id is retained
	/// instead of generating a fresh one.
	pub fn new(
		message: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let trace_id = source
			.as_deref()
			.and_then(|src| find_trace_id(src))
			.unwrap_or_else(|| Uuid::new_v4().to_string());

		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id,
		}
	}

	/// Creates a new error context and emits it to the log at error level.
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		log_error(&context);
		context
	}

	/// Adds a single key-value metadata pair, creating the map if needed.
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value.into());
		self
	}

	/// Formats the message with metadata appended as `message [k1=v1, k2=v2]`.
	///
	/// Metadata keys are sorted for stable output.
	pub fn format_with_metadata(&self) -> String {
		let mut result = self.message.clone();

		if let Some(metadata) = &self.metadata {
			if !metadata.is_empty() {
				let mut keys: Vec<_> = metadata.keys().collect();
				keys.sort();

				let parts = keys
					.iter()
					.filter_map(|key| metadata.get(*key).map(|v| format!("{}={}", key, v)))
					.collect::<Vec<_>>();

				result.push_str(&format!(" [{}]", parts.join(", ")));
			}
		}

		result
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_with_metadata())
	}
}

impl std::error::Error for ErrorContext {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_ref()
			.map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
	}
}

/// A trait for errors that can provide a trace ID
pub trait TraceableError: std::error::Error + Send + Sync {
	/// Returns the trace ID for this error
	fn trace_id(&self) -> String;
}

/// Walks an error chain looking for a trace id carried by one of this crate's
/// error types. Depth-limited so a pathological chain cannot recurse forever.
fn find_trace_id(err: &(dyn std::error::Error + 'static)) -> Option<String> {
	const MAX_DEPTH: usize = 4;

	let mut current = Some(err);
	for _ in 0..MAX_DEPTH {
		let err = current?;
		if let Some(id) = extract_trace_id(err) {
			return Some(id);
		}
		current = err.source();
	}
	None
}

/// Tries downcasting a single error to each of this crate's traceable types.
fn extract_trace_id(err: &(dyn std::error::Error + 'static)) -> Option<String> {
	if let Some(ctx) = err.downcast_ref::<ErrorContext>() {
		return Some(ctx.trace_id.clone());
	}

	macro_rules! try_downcast {
		($($ty:path),* $(,)?) => {
			$(
				if let Some(e) = err.downcast_ref::<$ty>() {
					return Some(e.trace_id());
				}
			)*
		}
	}

	try_downcast!(
		crate::models::ConfigError,
		crate::services::blockchain::RpcError,
		crate::services::poller::PollerError,
		crate::services::backend::BackendError,
	);

	None
}

/// Formats the complete error chain, one `Caused by:` line per source.
fn format_error_chain(err: &dyn std::error::Error) -> String {
	let mut result = err.to_string();
	let mut source = err.source();

	while let Some(err) = source {
		result.push_str("\n\tCaused by: ");
		result.push_str(&err.to_string());
		source = err.source();
	}

	result
}

/// Log the error with structured fields
fn log_error(error: &ErrorContext) {
	if let Some(source) = &error.source {
		tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			chain = %format_error_chain(source.as_ref()),
		);
	} else {
		tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
		);
	}
}
