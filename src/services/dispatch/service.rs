//! Dispatch service: turns matched events into running workers.
//!
//! Sits between the poller and the backend: applies the selector predicate,
//! materializes the worker spec, crosses the launch gate and calls the
//! backend. Dispatch is at-most-once per event id per dispatcher process;
//! duplicates and failures are dropped, never retried.

use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};

use crate::{
	models::{ChainEvent, MatchedEvent, WorkerHandle},
	services::{
		backend::{BackendError, WorkerBackend},
		dispatch::{
			gate::LaunchGate,
			materializer::{build_emitted_spec, build_generic_spec, WorkerTemplate},
		},
		filter::{match_selector, MatchOptions},
	},
};

/// Consumes events produced by a poller.
#[async_trait]
pub trait EventSink: Send + Sync {
	/// Handles one emitted event. Never fails: dispatch errors are terminal
	/// for the event and are logged, not propagated.
	async fn handle_event(&self, event: &ChainEvent);
}

/// Dispatches matched chain events and generic control-plane events.
pub struct DispatchService {
	backend: Arc<dyn WorkerBackend>,
	gate: Arc<LaunchGate>,
	template: WorkerTemplate,
	selector: String,
	match_options: MatchOptions,
	network_name: String,
}

impl DispatchService {
	pub fn new(
		backend: Arc<dyn WorkerBackend>,
		gate: Arc<LaunchGate>,
		template: WorkerTemplate,
		selector: String,
		match_options: MatchOptions,
		network_name: String,
	) -> Self {
		Self {
			backend,
			gate,
			template,
			selector,
			match_options,
			network_name,
		}
	}

	/// Creates a worker for a generic event received on the control plane.
	pub async fn dispatch_generic(
		&self,
		event: &MatchedEvent,
	) -> Result<WorkerHandle, BackendError> {
		let spec = build_generic_spec(&self.template, event);
		tracing::info!(
			event_id = %event.event_id,
			event_type = %event.event_type,
			worker = %spec.name,
			"dispatching generic event"
		);

		self.gate.acquire().await;
		self.backend.create(&spec).await
	}

	/// Environment entries stamped onto every event-dispatched worker.
	fn event_environment(&self, event: &ChainEvent) -> BTreeMap<String, String> {
		BTreeMap::from([
			("STARKNET_NETWORK".to_string(), self.network_name.clone()),
			("CONTRACT_ADDRESS".to_string(), event.from_address.clone()),
			("EVENT_SELECTOR".to_string(), self.selector.clone()),
			("BLOCK_NUMBER".to_string(), event.block_number.to_string()),
		])
	}
}

#[async_trait]
impl EventSink for DispatchService {
	async fn handle_event(&self, event: &ChainEvent) {
		let event_id = event.event_id();

		let Some(matched_key) = match_selector(&event.keys, &self.selector, &self.match_options)
		else {
			tracing::debug!(
				event_id = %event_id,
				selector = %self.selector,
				"event does not carry the selector, skipping"
			);
			return;
		};

		tracing::info!(
			event_id = %event_id,
			matched_key = %matched_key,
			"event matched selector"
		);

		let environment = self.event_environment(event);
		let spec = build_emitted_spec(&self.template, event, &self.selector, &environment);
		let worker = spec.name.clone();

		self.gate.acquire().await;
		match self.backend.create(&spec).await {
			Ok(handle) => {
				tracing::info!(
					event_id = %event_id,
					worker = %handle.name,
					namespace = %handle.namespace,
					"worker launched"
				);
			}
			Err(err) if err.is_already_exists() => {
				tracing::warn!(
					event_id = %event_id,
					worker = %worker,
					"worker already exists, dropping duplicate event"
				);
			}
			Err(err) => {
				tracing::error!(
					event_id = %event_id,
					worker = %worker,
					error = %err,
					"failed to launch worker, dropping event"
				);
			}
		}
	}
}
