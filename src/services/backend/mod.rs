//! Worker backend abstraction.
//!
//! The dispatch pipeline and the control plane target only this capability
//! set; the concrete substrate (Kubernetes batch jobs or Docker containers)
//! is chosen once at startup.

mod docker;
mod error;
mod kubernetes;

pub use docker::DockerBackend;
pub use error::BackendError;
pub use kubernetes::KubernetesBackend;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::models::{BackendKind, WorkerHandle, WorkerSpec, WorkerStatus};

/// Label carrying the sanitized event id on every worker.
///
/// This is the sole index used to terminate workers by event id.
pub const LABEL_EVENT_ID: &str = "event-id";
/// Label carrying the sanitized selector the worker was dispatched for.
pub const LABEL_SELECTOR: &str = "selector";
/// Label marking workers managed by this dispatcher.
pub const LABEL_APP: &str = "app";

/// Byte stream of worker log output.
pub type LogStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Options for a log stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStreamOptions {
	/// Keep the stream open and follow new output
	pub follow: bool,
	/// Number of trailing lines to start from
	pub tail: i64,
}

impl Default for LogStreamOptions {
	fn default() -> Self {
		Self {
			follow: true,
			tail: 100,
		}
	}
}

/// Capability set every workload substrate honors.
#[async_trait]
pub trait WorkerBackend: Send + Sync {
	/// The substrate this backend drives.
	fn kind(&self) -> BackendKind;

	/// Creates (and starts) a worker from the spec.
	async fn create(&self, spec: &WorkerSpec) -> Result<WorkerHandle, BackendError>;

	/// Reports the current status of a worker.
	async fn status(&self, name: &str) -> Result<WorkerStatus, BackendError>;

	/// Triggers deletion of a worker; dependents are cleaned asynchronously.
	async fn delete(&self, name: &str) -> Result<(), BackendError>;

	/// Lists workers carrying the label `key=value`.
	async fn list_by_label(
		&self,
		key: &str,
		value: &str,
	) -> Result<Vec<WorkerHandle>, BackendError>;

	/// Resolves a worker's display name to its handle.
	async fn find_by_name(&self, name: &str) -> Result<WorkerHandle, BackendError>;

	/// Opens a log stream for a worker.
	async fn stream_logs(
		&self,
		name: &str,
		options: &LogStreamOptions,
	) -> Result<LogStream, BackendError>;
}
