//! Event payloads exchanged with the control plane.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A matched event as accepted by `POST /event`.
///
/// `event_id` is the stable cross-reference between the dispatcher and the
/// worker it materializes; workers are labelled with its sanitized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedEvent {
	pub event_id: String,
	pub event_type: String,
	/// Decoded event payload, forwarded to the worker as JSON
	#[serde(default)]
	pub payload: serde_json::Map<String, serde_json::Value>,
	/// Extra environment entries for the worker; credential names are dropped
	#[serde(default)]
	pub environment: HashMap<String, String>,
}
