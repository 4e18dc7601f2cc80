//! Bootstrap wiring: constructs the backend, dispatcher and poller.
//!
//! Ownership is a tree rooted here: the dispatcher owns the gate and the
//! backend reference, the poller owns its cursor and chain client, and the
//! control plane shares the backend without sharing mutable state.

use std::sync::Arc;
use tokio::sync::watch;

use crate::{
	models::{BackendKind, BlockRef, DispatcherConfig, EventFilter},
	services::{
		backend::{DockerBackend, KubernetesBackend, WorkerBackend},
		blockchain::StarknetClient,
		dispatch::{DispatchService, LaunchGate, WorkerTemplate},
		filter::MatchOptions,
		poller::{EventPoller, PollerConfig},
	},
};

/// Type alias for handling service results
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Connects to the configured workload substrate.
pub async fn initialize_backend(
	config: &DispatcherConfig,
) -> Result<Arc<dyn WorkerBackend>> {
	match config.backend {
		BackendKind::Kubernetes => {
			let backend =
				KubernetesBackend::new(config.kubeconfig.as_deref(), &config.namespace).await?;
			Ok(Arc::new(backend))
		}
		BackendKind::Docker => {
			let backend = DockerBackend::new(&config.namespace)?;
			Ok(Arc::new(backend))
		}
	}
}

/// Builds the dispatch service over a connected backend.
pub fn create_dispatcher(
	config: &DispatcherConfig,
	backend: Arc<dyn WorkerBackend>,
) -> Arc<DispatchService> {
	let gate = Arc::new(LaunchGate::new(config.launch_interval));
	let template = WorkerTemplate {
		namespace: config.namespace.clone(),
		image: config.agent_image.clone(),
		service_account: config.service_account.clone(),
	};
	let match_options = MatchOptions {
		case_insensitive: config.case_insensitive,
		partial_match: config.partial_match,
	};

	Arc::new(DispatchService::new(
		backend,
		gate,
		template,
		config.selector.clone(),
		match_options,
		config.chain.network_name.clone(),
	))
}

/// Builds the event filter the poller scans with.
pub fn base_event_filter(config: &DispatcherConfig) -> EventFilter {
	let from_block = if config.start_block == 0 {
		BlockRef::Latest
	} else {
		BlockRef::ByNumber(config.start_block)
	};

	EventFilter {
		contract_address: config.contract_address.clone(),
		// All events of the contract are fetched; the selector predicate is
		// applied dispatcher-side.
		keys: Vec::new(),
		from_block,
		to_block: BlockRef::Latest,
		chunk_size: config.chunk_size,
	}
}

/// Spawns the poller task for the configured filter.
pub fn spawn_poller(
	config: &DispatcherConfig,
	dispatcher: Arc<DispatchService>,
	shutdown: watch::Receiver<bool>,
) -> Result<tokio::task::JoinHandle<()>> {
	let client = StarknetClient::new(&config.chain.node_url)?;
	let poller_config = PollerConfig {
		batch_size: config.batch_size,
		..PollerConfig::default()
	};
	let poller = EventPoller::new(
		client,
		dispatcher,
		base_event_filter(config),
		poller_config,
	);

	Ok(tokio::spawn(poller.run(shutdown)))
}
