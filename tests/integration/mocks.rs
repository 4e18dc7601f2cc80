//! Mock implementations of the chain client and worker backend traits.
//!
//! These mocks allow exercising the poller, dispatch pipeline and control
//! plane without a chain endpoint or a workload substrate.

use async_trait::async_trait;
use mockall::mock;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use starknet_agent_dispatcher::{
	models::{
		BackendKind, BlockHashAndNumber, ChainEvent, EventFilter, WorkerHandle, WorkerSpec,
		WorkerStatus,
	},
	services::{
		backend::{BackendError, LogStream, LogStreamOptions, WorkerBackend},
		blockchain::{ChainClient, RpcError},
		dispatch::{DispatchService, LaunchGate, WorkerTemplate},
		filter::MatchOptions,
	},
};

/// Selector used across the integration tests.
pub const TEST_SELECTOR: &str =
	"0x4843fbb65c717bb5ece80d635a568aa1c688f880f0519e3de18bf3bae89abf8";

mock! {
	/// Mock implementation of the chain client trait.
	pub ChainClient {}

	#[async_trait]
	impl ChainClient for ChainClient {
		async fn latest_block(&self) -> Result<BlockHashAndNumber, RpcError>;
		async fn block_number_of(&self, block_hash: &str) -> Result<u64, RpcError>;
		async fn get_events(&self, filter: &EventFilter) -> Result<Vec<ChainEvent>, RpcError>;
	}
}

mock! {
	/// Mock implementation of the worker backend trait.
	pub Backend {}

	#[async_trait]
	impl WorkerBackend for Backend {
		fn kind(&self) -> BackendKind;
		async fn create(&self, spec: &WorkerSpec) -> Result<WorkerHandle, BackendError>;
		async fn status(&self, name: &str) -> Result<WorkerStatus, BackendError>;
		async fn delete(&self, name: &str) -> Result<(), BackendError>;
		async fn list_by_label(
			&self,
			key: &str,
			value: &str,
		) -> Result<Vec<WorkerHandle>, BackendError>;
		async fn find_by_name(&self, name: &str) -> Result<WorkerHandle, BackendError>;
		async fn stream_logs(
			&self,
			name: &str,
			options: &LogStreamOptions,
		) -> Result<LogStream, BackendError>;
	}
}

/// Builds an emitted event with the given coordinates and keys.
pub fn chain_event(block_number: u64, tx_hash: &str, event_index: u32, keys: &[&str]) -> ChainEvent {
	ChainEvent {
		block_number,
		block_hash: format!("0xb{:x}", block_number),
		transaction_hash: tx_hash.to_string(),
		from_address: "0x198cbb29ed691e3e143da013736cb32d2eb35835414e0c5ba758f44265d7a52"
			.to_string(),
		keys: keys.iter().map(|k| k.to_string()).collect(),
		data: vec!["0x1".to_string(), "0x2".to_string()],
		event_index,
	}
}

/// Builds a handle as a backend would return it.
pub fn worker_handle(name: &str) -> WorkerHandle {
	WorkerHandle {
		name: name.to_string(),
		namespace: "my-agents".to_string(),
		labels: BTreeMap::new(),
		created_at: None,
	}
}

/// Builds a dispatch service over a mocked backend.
///
/// The launch interval defaults to zero so tests not about spacing run
/// without waiting.
pub fn dispatch_service(
	backend: Arc<dyn WorkerBackend>,
	launch_interval: Duration,
) -> Arc<DispatchService> {
	Arc::new(DispatchService::new(
		backend,
		Arc::new(LaunchGate::new(launch_interval)),
		WorkerTemplate {
			namespace: "my-agents".to_string(),
			image: "dreams-agents-client:latest".to_string(),
			service_account: None,
		},
		TEST_SELECTOR.to_string(),
		MatchOptions {
			case_insensitive: true,
			partial_match: false,
		},
		"sepolia".to_string(),
	))
}
