//! Error types for worker backend operations.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors raised by a workload substrate
#[derive(ThisError, Debug)]
pub enum BackendError {
	/// A worker with the same name already exists
	#[error("Worker already exists: {0}")]
	AlreadyExists(ErrorContext),

	/// The requested worker does not exist
	#[error("Worker not found: {0}")]
	NotFound(ErrorContext),

	/// The worker spec was rejected by the substrate
	#[error("Invalid worker spec: {0}")]
	InvalidSpec(ErrorContext),

	/// The substrate cannot be reached or refused the request
	#[error("Substrate unavailable: {0}")]
	Unavailable(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl BackendError {
	pub fn already_exists(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::AlreadyExists(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn not_found(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::NotFound(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn invalid_spec(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidSpec(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn unavailable(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Unavailable(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// True when the underlying resource was missing.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_))
	}

	/// True when the create collided with an existing worker.
	pub fn is_already_exists(&self) -> bool {
		matches!(self, Self::AlreadyExists(_))
	}
}

impl TraceableError for BackendError {
	fn trace_id(&self) -> String {
		match self {
			Self::AlreadyExists(ctx) => ctx.trace_id.clone(),
			Self::NotFound(ctx) => ctx.trace_id.clone(),
			Self::InvalidSpec(ctx) => ctx.trace_id.clone(),
			Self::Unavailable(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
