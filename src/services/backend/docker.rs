//! Docker container realization of the worker backend.
//!
//! Each worker is a container on the local Docker daemon, attached to a fixed
//! network scope. Status is maintained in an in-process map keyed by
//! container id; the daemon is not queried for it. Name lookup scans the
//! runtime's container listing and matches on the trimmed name.

use async_trait::async_trait;
use bollard::container::{
	Config, CreateContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
	StartContainerOptions, StopContainerOptions,
};
use bollard::models::{ContainerSummary, HostConfig};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
	models::{BackendKind, WorkerHandle, WorkerPhase, WorkerSpec, WorkerStatus},
	services::backend::{
		error::BackendError, LogStream, LogStreamOptions, WorkerBackend, LABEL_EVENT_ID,
	},
};

/// Network scope every worker container is attached to.
const WORKER_NETWORK_MODE: &str = "bridge";
/// Seconds the daemon waits before killing a stopping container.
const DEFAULT_STOP_TIMEOUT_SECS: i64 = 10;

/// State tracked per container, keyed by container id.
#[derive(Debug, Clone)]
struct ContainerRecord {
	status: WorkerStatus,
	labels: BTreeMap<String, String>,
}

/// Worker backend backed by local Docker containers.
#[derive(Clone)]
pub struct DockerBackend {
	docker: Docker,
	scope: String,
	stop_timeout_secs: i64,
	records: Arc<RwLock<HashMap<String, ContainerRecord>>>,
}

impl DockerBackend {
	/// Connects to the local Docker daemon.
	pub fn new(scope: &str) -> Result<Self, BackendError> {
		let docker = Docker::connect_with_local_defaults().map_err(|e| {
			BackendError::unavailable(
				"failed to connect to Docker daemon",
				Some(Box::new(e)),
				None,
			)
		})?;

		Ok(Self {
			docker,
			scope: scope.to_string(),
			stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
			records: Arc::new(RwLock::new(HashMap::new())),
		})
	}

	fn map_error(&self, err: bollard::errors::Error, worker: &str) -> BackendError {
		let metadata = Some(HashMap::from([(
			"worker".to_string(),
			worker.to_string(),
		)]));

		let status_code = match &err {
			bollard::errors::Error::DockerResponseServerError { status_code, .. } => *status_code,
			_ => 0,
		};

		match status_code {
			409 => BackendError::already_exists(
				format!("container {} already exists", worker),
				Some(Box::new(err)),
				metadata,
			),
			404 => BackendError::not_found(
				format!("container {} not found", worker),
				Some(Box::new(err)),
				metadata,
			),
			400 => BackendError::invalid_spec(
				format!("container spec for {} was rejected", worker),
				Some(Box::new(err)),
				metadata,
			),
			_ => BackendError::unavailable(
				format!("Docker request for {} failed", worker),
				Some(Box::new(err)),
				metadata,
			),
		}
	}

	fn handle_from_summary(&self, summary: &ContainerSummary) -> WorkerHandle {
		WorkerHandle {
			name: summary.id.clone().unwrap_or_default(),
			namespace: self.scope.clone(),
			labels: summary
				.labels
				.clone()
				.map(|labels| labels.into_iter().collect())
				.unwrap_or_default(),
			created_at: summary
				.created
				.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
		}
	}
}

/// Builds the flat `NAME=value` environment list for a container.
///
/// Secret references become `<NAME>_FILE` paths under `/run/secrets`; the
/// credential values themselves never enter the list.
fn build_container_env(spec: &WorkerSpec) -> Vec<String> {
	let mut env: Vec<String> = spec
		.env
		.iter()
		.map(|var| format!("{}={}", var.name, var.value))
		.collect();

	for secret in &spec.secret_env {
		env.push(format!(
			"{}_FILE=/run/secrets/{}/{}",
			secret.name, secret.secret_name, secret.secret_key
		));
	}

	env
}

/// True when a listed container's trimmed name equals `name`.
///
/// The daemon reports names with a leading slash.
fn summary_matches_name(summary: &ContainerSummary, name: &str) -> bool {
	summary
		.names
		.as_ref()
		.map(|names| {
			names
				.iter()
				.any(|candidate| candidate.trim_start_matches('/').trim() == name)
		})
		.unwrap_or(false)
}

#[async_trait]
impl WorkerBackend for DockerBackend {
	fn kind(&self) -> BackendKind {
		BackendKind::Docker
	}

	async fn create(&self, spec: &WorkerSpec) -> Result<WorkerHandle, BackendError> {
		let options = CreateContainerOptions {
			name: spec.name.clone(),
			platform: None,
		};

		let config = Config::<String> {
			image: Some(spec.image.clone()),
			env: Some(build_container_env(spec)),
			labels: Some(spec.labels.clone().into_iter().collect()),
			host_config: Some(HostConfig {
				network_mode: Some(WORKER_NETWORK_MODE.to_string()),
				..Default::default()
			}),
			..Default::default()
		};

		let created = self
			.docker
			.create_container(Some(options), config)
			.await
			.map_err(|e| self.map_error(e, &spec.name))?;

		let created_at = Utc::now();
		{
			let mut records = self.records.write().await;
			records.insert(
				created.id.clone(),
				ContainerRecord {
					status: WorkerStatus {
						phase: WorkerPhase::Queued,
						created_at: Some(created_at),
						started_at: None,
						completed_at: None,
						counters: None,
						event_id: spec.labels.get(LABEL_EVENT_ID).cloned(),
					},
					labels: spec.labels.clone(),
				},
			);
		}

		self.docker
			.start_container(&created.id, None::<StartContainerOptions<String>>)
			.await
			.map_err(|e| self.map_error(e, &spec.name))?;

		{
			let mut records = self.records.write().await;
			if let Some(record) = records.get_mut(&created.id) {
				record.status.phase = WorkerPhase::Running;
				record.status.started_at = Some(Utc::now());
			}
		}

		tracing::info!(
			container = %created.id,
			name = %spec.name,
			"created and started worker container"
		);

		Ok(WorkerHandle {
			name: created.id,
			namespace: self.scope.clone(),
			labels: spec.labels.clone(),
			created_at: Some(created_at),
		})
	}

	async fn status(&self, name: &str) -> Result<WorkerStatus, BackendError> {
		let records = self.records.read().await;
		records
			.get(name)
			.map(|record| record.status.clone())
			.ok_or_else(|| {
				BackendError::not_found(format!("container {} is not tracked", name), None, None)
			})
	}

	async fn delete(&self, name: &str) -> Result<(), BackendError> {
		let stop_result = self
			.docker
			.stop_container(
				name,
				Some(StopContainerOptions {
					t: self.stop_timeout_secs,
				}),
			)
			.await;

		// 304 means the container is already stopped; removal proceeds.
		if let Err(err) = stop_result {
			let already_stopped = matches!(
				&err,
				bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }
			);
			if !already_stopped {
				return Err(self.map_error(err, name));
			}
		}

		self.docker
			.remove_container(
				name,
				Some(RemoveContainerOptions {
					force: false,
					..Default::default()
				}),
			)
			.await
			.map_err(|e| self.map_error(e, name))?;

		self.records.write().await.remove(name);

		tracing::info!(container = %name, "worker container removed");
		Ok(())
	}

	async fn list_by_label(
		&self,
		key: &str,
		value: &str,
	) -> Result<Vec<WorkerHandle>, BackendError> {
		let filters = HashMap::from([(
			"label".to_string(),
			vec![format!("{}={}", key, value)],
		)]);

		let summaries = self
			.docker
			.list_containers(Some(ListContainersOptions::<String> {
				all: true,
				filters,
				..Default::default()
			}))
			.await
			.map_err(|e| self.map_error(e, value))?;

		Ok(summaries
			.iter()
			.map(|summary| self.handle_from_summary(summary))
			.collect())
	}

	async fn find_by_name(&self, name: &str) -> Result<WorkerHandle, BackendError> {
		let summaries = self
			.docker
			.list_containers(Some(ListContainersOptions::<String> {
				all: true,
				..Default::default()
			}))
			.await
			.map_err(|e| self.map_error(e, name))?;

		summaries
			.iter()
			.find(|summary| summary_matches_name(summary, name))
			.map(|summary| self.handle_from_summary(summary))
			.ok_or_else(|| {
				BackendError::not_found(format!("no container named {}", name), None, None)
			})
	}

	async fn stream_logs(
		&self,
		name: &str,
		options: &LogStreamOptions,
	) -> Result<LogStream, BackendError> {
		// Surface a 404 up front instead of from the first stream read.
		self.docker
			.inspect_container(name, None)
			.await
			.map_err(|e| self.map_error(e, name))?;

		let log_options = LogsOptions::<String> {
			follow: options.follow,
			stdout: true,
			stderr: true,
			timestamps: true,
			tail: options.tail.to_string(),
			..Default::default()
		};

		let stream = self
			.docker
			.logs(name, Some(log_options))
			.map(|chunk| match chunk {
				Ok(output) => Ok(output.into_bytes()),
				Err(e) => Err(BackendError::unavailable(
					"log stream read failed",
					Some(Box::new(e)),
					None,
				)),
			})
			.boxed();

		Ok(stream)
	}
}
