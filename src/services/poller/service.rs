//! Event poller: batched scans of `[cursor, latest]` on a fixed tick.
//!
//! One poller task per configured filter. Each tick resolves the chain head,
//! walks the unprocessed range in batches and hands every event to the sink
//! in `(block_number, event_index)` order. Errors never propagate out of a
//! tick: head-resolution failures abort the tick, a failed batch stops the
//! tick without advancing the cursor past it, and the next tick retries.

use std::{cmp, collections::HashSet, sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use crate::{
	models::{BlockRef, EventFilter},
	services::{
		blockchain::ChainClient,
		dispatch::EventSink,
		poller::{cursor::BlockCursor, error::PollerError},
	},
};

/// Poller cadence and batching parameters.
#[derive(Debug, Clone)]
pub struct PollerConfig {
	/// Maximum blocks per `starknet_getEvents` call
	pub batch_size: u64,
	/// Wall-clock tick between scans
	pub poll_interval: Duration,
	/// Bound on the advisory processed-block set
	pub processed_capacity: usize,
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self {
			batch_size: 30,
			poll_interval: Duration::from_secs(15),
			processed_capacity: 1000,
		}
	}
}

/// Advisory record of processed block heights.
///
/// Guards against a backend that re-returns a block across ticks. Bounded:
/// when the capacity is exceeded the lower half of the recorded heights is
/// discarded. The cursor, not this set, is authoritative for progress.
struct ProcessedBlocks {
	blocks: HashSet<u64>,
	capacity: usize,
}

impl ProcessedBlocks {
	fn new(capacity: usize) -> Self {
		Self {
			blocks: HashSet::new(),
			capacity: capacity.max(2),
		}
	}

	fn contains(&self, block: u64) -> bool {
		self.blocks.contains(&block)
	}

	fn mark_range(&mut self, start: u64, end: u64) {
		for block in start..=end {
			self.blocks.insert(block);
		}

		if self.blocks.len() > self.capacity {
			let mut sorted: Vec<u64> = self.blocks.iter().copied().collect();
			sorted.sort_unstable();
			let cutoff = sorted[sorted.len() / 2];
			self.blocks.retain(|block| *block >= cutoff);
		}
	}

	fn len(&self) -> usize {
		self.blocks.len()
	}
}

/// Polls one chain endpoint for events of one contract and feeds a sink.
pub struct EventPoller<C, S> {
	chain: C,
	sink: Arc<S>,
	filter: EventFilter,
	config: PollerConfig,
	cursor: Option<BlockCursor>,
	processed: ProcessedBlocks,
}

impl<C, S> EventPoller<C, S>
where
	C: ChainClient,
	S: EventSink,
{
	/// Creates a poller over `filter`; the cursor is resolved by
	/// [`initialize`](Self::initialize).
	pub fn new(chain: C, sink: Arc<S>, filter: EventFilter, config: PollerConfig) -> Self {
		let processed = ProcessedBlocks::new(config.processed_capacity);
		Self {
			chain,
			sink,
			filter,
			config,
			cursor: None,
			processed,
		}
	}

	/// The cursor position, once initialized.
	pub fn cursor_position(&self) -> Option<u64> {
		self.cursor.as_ref().map(BlockCursor::position)
	}

	/// Resolves the initial cursor from the filter's `from_block`.
	///
	/// A `latest` start is resolved in two steps: head hash first, then the
	/// hash's block number.
	pub async fn initialize(&mut self) -> Result<(), PollerError> {
		let start = match &self.filter.from_block {
			BlockRef::ByNumber(number) => *number,
			BlockRef::Latest => {
				let head = self.chain.latest_block().await.map_err(|e| {
					PollerError::startup_error(
						"failed to resolve chain head",
						Some(Box::new(e)),
						None,
					)
				})?;
				self.chain
					.block_number_of(&head.block_hash)
					.await
					.map_err(|e| {
						PollerError::startup_error(
							format!("failed to resolve block number for {}", head.block_hash),
							Some(Box::new(e)),
							None,
						)
					})?
			}
			BlockRef::ByHash(hash) => {
				self.chain.block_number_of(hash).await.map_err(|e| {
					PollerError::startup_error(
						format!("failed to resolve block number for {}", hash),
						Some(Box::new(e)),
						None,
					)
				})?
			}
		};

		tracing::info!(start_block = start, "poller cursor initialized");
		self.cursor = Some(BlockCursor::new(start));
		Ok(())
	}

	/// Runs one tick: scan `[cursor, latest]` in batches.
	#[instrument(skip(self))]
	pub async fn poll_once(&mut self) {
		let Some(mut position) = self.cursor_position() else {
			tracing::warn!("poller tick before cursor initialization, skipping");
			return;
		};

		let head = match self.chain.latest_block().await {
			Ok(head) => head,
			Err(err) => {
				tracing::warn!(error = %err, "failed to fetch chain head, tick aborted");
				return;
			}
		};

		let latest = match self.chain.block_number_of(&head.block_hash).await {
			Ok(number) => number,
			Err(err) => {
				tracing::warn!(
					block_hash = %head.block_hash,
					error = %err,
					"failed to resolve head block number, tick aborted"
				);
				return;
			}
		};

		while position <= latest {
			let end = cmp::min(position + self.config.batch_size - 1, latest);
			let batch_filter = self.filter.with_block_range(position, end);

			let mut events = match self.chain.get_events(&batch_filter).await {
				Ok(events) => events,
				Err(err) => {
					// The cursor stays on this batch; the next tick retries it.
					tracing::error!(
						from_block = position,
						to_block = end,
						error = %err,
						"failed to fetch events, stopping tick"
					);
					break;
				}
			};

			if !events.is_empty() {
				tracing::info!(
					from_block = position,
					to_block = end,
					count = events.len(),
					"events found"
				);
			}

			events.sort_by_key(|event| (event.block_number, event.event_index));

			for event in &events {
				if self.processed.contains(event.block_number) {
					tracing::debug!(
						block = event.block_number,
						event_id = %event.event_id(),
						"block already processed, skipping re-returned event"
					);
					continue;
				}
				self.sink.handle_event(event).await;
			}

			self.processed.mark_range(position, end);
			if let Some(cursor) = self.cursor.as_mut() {
				cursor.advance_to(end + 1);
			}
			position = end + 1;
		}
	}

	/// Runs the polling loop until shutdown.
	///
	/// A startup failure terminates the poller task only; the rest of the
	/// process keeps serving.
	pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
		if self.cursor.is_none() {
			if let Err(err) = self.initialize().await {
				tracing::error!(error = %err, "poller startup failed, poller terminating");
				return;
			}
		}

		let mut ticker = tokio::time::interval(self.config.poll_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					self.poll_once().await;
				}
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						tracing::info!("poller shutting down");
						return;
					}
				}
			}
		}
	}
}
