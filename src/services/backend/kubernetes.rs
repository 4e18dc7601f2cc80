//! Kubernetes batch-job realization of the worker backend.
//!
//! Each worker is a `batch/v1` Job in a configured namespace; the Job
//! controller manages the pod. Deletion uses background propagation so pods
//! are cleaned up asynchronously, and log streaming locates the pod through
//! the `job-name` label the controller stamps on it.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::{
	batch::v1::{Job, JobSpec},
	core::v1::{
		Container, EnvVar as K8sEnvVar, EnvVarSource, Pod, PodSpec, PodTemplateSpec,
		SecretKeySelector,
	},
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{
	api::{Api, DeleteParams, ListParams, LogParams, PostParams},
	config::{KubeConfigOptions, Kubeconfig},
	Client, Config,
};
use std::{collections::HashMap, path::Path};
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;

use crate::{
	models::{
		BackendKind, WorkerCounters, WorkerHandle, WorkerPhase, WorkerSpec, WorkerStatus,
	},
	services::backend::{
		error::BackendError, LogStream, LogStreamOptions, WorkerBackend, LABEL_EVENT_ID,
	},
};

/// Name of the single container inside each worker pod.
const WORKER_CONTAINER_NAME: &str = "agent-container";
/// Label the Job controller stamps on pods it owns.
const JOB_NAME_LABEL: &str = "job-name";
/// Retries for the pod before the job is marked failed.
const JOB_BACKOFF_LIMIT: i32 = 1;

/// Worker backend backed by Kubernetes batch jobs.
#[derive(Clone)]
pub struct KubernetesBackend {
	jobs: Api<Job>,
	pods: Api<Pod>,
	namespace: String,
}

impl KubernetesBackend {
	/// Connects to the cluster.
	///
	/// With an explicit kubeconfig path that file is used; otherwise the
	/// in-cluster environment is tried first with a fallback to the default
	/// kubeconfig location.
	pub async fn new(
		kubeconfig: Option<&Path>,
		namespace: &str,
	) -> Result<Self, BackendError> {
		let config = match kubeconfig {
			Some(path) => {
				let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
					BackendError::unavailable(
						format!("failed to read kubeconfig at {}", path.display()),
						Some(Box::new(e)),
						None,
					)
				})?;
				Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
					.await
					.map_err(|e| {
						BackendError::unavailable(
							"failed to build cluster config from kubeconfig",
							Some(Box::new(e)),
							None,
						)
					})?
			}
			None => Config::infer().await.map_err(|e| {
				BackendError::unavailable(
					"no in-cluster environment and no usable kubeconfig",
					Some(Box::new(e)),
					None,
				)
			})?,
		};

		let client = Client::try_from(config).map_err(|e| {
			BackendError::unavailable(
				"failed to create Kubernetes client",
				Some(Box::new(e)),
				None,
			)
		})?;

		Ok(Self {
			jobs: Api::namespaced(client.clone(), namespace),
			pods: Api::namespaced(client, namespace),
			namespace: namespace.to_string(),
		})
	}

	fn map_error(&self, err: kube::Error, worker: &str) -> BackendError {
		let metadata = Some(HashMap::from([
			("worker".to_string(), worker.to_string()),
			("namespace".to_string(), self.namespace.clone()),
		]));

		let code = match &err {
			kube::Error::Api(response) => response.code,
			_ => 0,
		};

		match code {
			409 => BackendError::already_exists(
				format!("job {} already exists", worker),
				Some(Box::new(err)),
				metadata,
			),
			404 => BackendError::not_found(
				format!("job {} not found", worker),
				Some(Box::new(err)),
				metadata,
			),
			400 | 422 => BackendError::invalid_spec(
				format!("job {} was rejected", worker),
				Some(Box::new(err)),
				metadata,
			),
			_ => BackendError::unavailable(
				format!("Kubernetes request for {} failed", worker),
				Some(Box::new(err)),
				metadata,
			),
		}
	}
}

/// Builds the Job manifest for a worker spec.
fn build_job(namespace: &str, spec: &WorkerSpec) -> Job {
	let mut env: Vec<K8sEnvVar> = spec
		.env
		.iter()
		.map(|var| K8sEnvVar {
			name: var.name.clone(),
			value: Some(var.value.clone()),
			value_from: None,
		})
		.collect();

	for secret in &spec.secret_env {
		env.push(K8sEnvVar {
			name: secret.name.clone(),
			value: None,
			value_from: Some(EnvVarSource {
				secret_key_ref: Some(SecretKeySelector {
					name: Some(secret.secret_name.clone()),
					key: secret.secret_key.clone(),
					optional: Some(secret.optional),
				}),
				..Default::default()
			}),
		});
	}

	// Pods repeat the app and event-id labels so they are addressable
	// independently of the owning job.
	let mut pod_labels = spec.labels.clone();
	pod_labels.remove(super::LABEL_SELECTOR);

	Job {
		metadata: ObjectMeta {
			name: Some(spec.name.clone()),
			namespace: Some(namespace.to_string()),
			labels: Some(spec.labels.clone()),
			..Default::default()
		},
		spec: Some(JobSpec {
			backoff_limit: Some(JOB_BACKOFF_LIMIT),
			template: PodTemplateSpec {
				metadata: Some(ObjectMeta {
					labels: Some(pod_labels),
					..Default::default()
				}),
				spec: Some(PodSpec {
					containers: vec![Container {
						name: WORKER_CONTAINER_NAME.to_string(),
						image: Some(spec.image.clone()),
						env: Some(env),
						..Default::default()
					}],
					restart_policy: Some("Never".to_string()),
					service_account_name: spec.service_account.clone(),
					..Default::default()
				}),
			},
			..Default::default()
		}),
		status: None,
	}
}

/// Derives the worker phase from batch-job counters.
fn phase_from_counters(counters: &WorkerCounters, has_start_time: bool) -> WorkerPhase {
	if counters.succeeded > 0 {
		WorkerPhase::Succeeded
	} else if counters.failed > 0 {
		WorkerPhase::Failed
	} else if counters.active > 0 {
		WorkerPhase::Running
	} else if has_start_time {
		WorkerPhase::Pending
	} else {
		WorkerPhase::Queued
	}
}

fn handle_from_job(job: &Job, namespace: &str) -> WorkerHandle {
	WorkerHandle {
		name: job.metadata.name.clone().unwrap_or_default(),
		namespace: namespace.to_string(),
		labels: job.metadata.labels.clone().unwrap_or_default(),
		created_at: job.metadata.creation_timestamp.clone().map(|t| t.0),
	}
}

fn status_from_job(job: &Job) -> WorkerStatus {
	let job_status = job.status.clone().unwrap_or_default();
	let counters = WorkerCounters {
		active: job_status.active.unwrap_or(0),
		succeeded: job_status.succeeded.unwrap_or(0),
		failed: job_status.failed.unwrap_or(0),
	};

	WorkerStatus {
		phase: phase_from_counters(&counters, job_status.start_time.is_some()),
		created_at: job.metadata.creation_timestamp.clone().map(|t| t.0),
		started_at: job_status.start_time.map(|t| t.0),
		completed_at: job_status.completion_time.map(|t| t.0),
		counters: Some(counters),
		event_id: job
			.metadata
			.labels
			.as_ref()
			.and_then(|labels| labels.get(LABEL_EVENT_ID).cloned()),
	}
}

#[async_trait]
impl WorkerBackend for KubernetesBackend {
	fn kind(&self) -> BackendKind {
		BackendKind::Kubernetes
	}

	async fn create(&self, spec: &WorkerSpec) -> Result<WorkerHandle, BackendError> {
		let job = build_job(&self.namespace, spec);

		let created = self
			.jobs
			.create(&PostParams::default(), &job)
			.await
			.map_err(|e| self.map_error(e, &spec.name))?;

		tracing::info!(
			job = %spec.name,
			namespace = %self.namespace,
			"created worker job"
		);

		Ok(handle_from_job(&created, &self.namespace))
	}

	async fn status(&self, name: &str) -> Result<WorkerStatus, BackendError> {
		let job = self
			.jobs
			.get(name)
			.await
			.map_err(|e| self.map_error(e, name))?;

		Ok(status_from_job(&job))
	}

	async fn delete(&self, name: &str) -> Result<(), BackendError> {
		self.jobs
			.delete(name, &DeleteParams::background())
			.await
			.map_err(|e| self.map_error(e, name))?;

		tracing::info!(job = %name, "worker job marked for deletion");
		Ok(())
	}

	async fn list_by_label(
		&self,
		key: &str,
		value: &str,
	) -> Result<Vec<WorkerHandle>, BackendError> {
		let params = ListParams::default().labels(&format!("{}={}", key, value));
		let jobs = self
			.jobs
			.list(&params)
			.await
			.map_err(|e| self.map_error(e, value))?;

		Ok(jobs
			.items
			.iter()
			.map(|job| handle_from_job(job, &self.namespace))
			.collect())
	}

	async fn find_by_name(&self, name: &str) -> Result<WorkerHandle, BackendError> {
		let job = self
			.jobs
			.get(name)
			.await
			.map_err(|e| self.map_error(e, name))?;

		Ok(handle_from_job(&job, &self.namespace))
	}

	async fn stream_logs(
		&self,
		name: &str,
		options: &LogStreamOptions,
	) -> Result<LogStream, BackendError> {
		let params = ListParams::default().labels(&format!("{}={}", JOB_NAME_LABEL, name));
		let pods = self
			.pods
			.list(&params)
			.await
			.map_err(|e| self.map_error(e, name))?;

		// The pod may not exist yet (job pending) or may already be cleaned
		// up; either way there is nothing to stream from.
		let pod_name = pods
			.items
			.first()
			.and_then(|pod| pod.metadata.name.clone())
			.ok_or_else(|| {
				BackendError::not_found(
					format!("no pod found for job {}", name),
					None,
					Some(HashMap::from([(
						"namespace".to_string(),
						self.namespace.clone(),
					)])),
				)
			})?;

		let log_params = LogParams {
			follow: options.follow,
			tail_lines: Some(options.tail),
			timestamps: true,
			..Default::default()
		};

		let reader = self
			.pods
			.log_stream(&pod_name, &log_params)
			.await
			.map_err(|e| self.map_error(e, name))?;

		let stream = ReaderStream::new(reader.compat())
			.map_err(|e| {
				BackendError::unavailable("log stream read failed", Some(Box::new(e)), None)
			})
			.boxed();

		Ok(stream)
	}
}
