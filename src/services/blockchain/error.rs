//! Error types for chain RPC operations.
//!
//! Distinguishes transport failures (network/IO), protocol failures
//! (malformed responses) and errors reported by the remote node.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur while talking to the chain node
#[derive(ThisError, Debug)]
pub enum RpcError {
	/// Network or IO failure while sending the request
	#[error("RPC transport error: {0}")]
	TransportError(ErrorContext),

	/// The response could not be interpreted as JSON-RPC
	#[error("RPC protocol error: {0}")]
	ProtocolError(ErrorContext),

	/// The node answered with a JSON-RPC error member
	#[error("RPC remote error (code {code}): {message}")]
	RemoteError {
		code: i64,
		message: String,
		context: ErrorContext,
	},

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl RpcError {
	pub fn transport_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::TransportError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn protocol_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ProtocolError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn remote_error(code: i64, message: impl Into<String>, method: &str) -> Self {
		let message = message.into();
		let context = ErrorContext::new_with_log(
			format!("node returned error for {}: {}", method, message),
			None,
			Some(HashMap::from([
				("method".to_string(), method.to_string()),
				("code".to_string(), code.to_string()),
			])),
		);
		Self::RemoteError {
			code,
			message,
			context,
		}
	}
}

impl TraceableError for RpcError {
	fn trace_id(&self) -> String {
		match self {
			Self::TransportError(ctx) => ctx.trace_id.clone(),
			Self::ProtocolError(ctx) => ctx.trace_id.clone(),
			Self::RemoteError { context, .. } => context.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
