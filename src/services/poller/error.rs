//! Error types for the event poller.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors raised by the event poller
#[derive(ThisError, Debug)]
pub enum PollerError {
	/// The initial cursor could not be resolved; the poller cannot start
	#[error("Poller startup error: {0}")]
	StartupError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl PollerError {
	pub fn startup_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StartupError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for PollerError {
	fn trace_id(&self) -> String {
		match self {
			Self::StartupError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
