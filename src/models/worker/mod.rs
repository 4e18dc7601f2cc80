//! Worker data structures shared by the materializer, the backends and the
//! control plane.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A plain environment variable passed to a worker by value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
	pub name: String,
	pub value: String,
}

impl EnvVar {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// An environment variable furnished by reference to a named secret.
///
/// Raw credential values never appear in a worker spec; the backend resolves
/// the reference with whatever secret primitive the substrate provides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretEnvVar {
	/// Environment variable name inside the worker
	pub name: String,
	/// Name of the secret object holding the value
	pub secret_name: String,
	/// Key within the secret
	pub secret_key: String,
	/// Whether the worker may start when the key is absent
	pub optional: bool,
}

/// Everything a backend needs to materialize one worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerSpec {
	/// Worker name; the substrate may append its own disambiguating suffix
	pub name: String,
	/// Namespace or scope the worker is created in
	pub namespace: String,
	/// Image reference for the worker container
	pub image: String,
	/// Optional service identity assumed by the worker
	pub service_account: Option<String>,
	/// Labels used to find and manage the worker later
	pub labels: BTreeMap<String, String>,
	pub env: Vec<EnvVar>,
	pub secret_env: Vec<SecretEnvVar>,
}

/// A value-typed reference to a worker owned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerHandle {
	pub name: String,
	pub namespace: String,
	pub labels: BTreeMap<String, String>,
	pub created_at: Option<DateTime<Utc>>,
}

/// Coarse lifecycle phase of a worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerPhase {
	Queued,
	Pending,
	Running,
	Succeeded,
	Failed,
	Unknown,
}

impl fmt::Display for WorkerPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			WorkerPhase::Queued => "Queued",
			WorkerPhase::Pending => "Pending",
			WorkerPhase::Running => "Running",
			WorkerPhase::Succeeded => "Succeeded",
			WorkerPhase::Failed => "Failed",
			WorkerPhase::Unknown => "Unknown",
		};
		f.write_str(name)
	}
}

/// Unit counters reported by batch-job substrates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerCounters {
	pub active: i32,
	pub succeeded: i32,
	pub failed: i32,
}

/// Point-in-time status of a worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerStatus {
	pub phase: WorkerPhase,
	pub created_at: Option<DateTime<Utc>>,
	pub started_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	/// Present when the substrate is a batch-job controller
	pub counters: Option<WorkerCounters>,
	/// Sanitized event id recorded on the worker's labels
	pub event_id: Option<String>,
}

impl WorkerStatus {
	/// A status with only a phase, everything else unknown.
	pub fn from_phase(phase: WorkerPhase) -> Self {
		Self {
			phase,
			created_at: None,
			started_at: None,
			completed_at: None,
			counters: None,
			event_id: None,
		}
	}
}
