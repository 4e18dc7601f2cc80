//! Starknet chain client.
//!
//! Typed wrappers over the three JSON-RPC methods the dispatcher consumes:
//! `starknet_blockHashAndNumber`, `starknet_getBlockWithTxs` and
//! `starknet_getEvents`.

use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use crate::{
	models::{BlockHashAndNumber, ChainEvent, EventFilter, EventsPage},
	services::blockchain::{
		error::RpcError,
		transport::{HttpRpcTransport, RpcTransport},
	},
};

const RPC_METHOD_BLOCK_HASH_AND_NUMBER: &str = "starknet_blockHashAndNumber";
const RPC_METHOD_GET_BLOCK_WITH_TXS: &str = "starknet_getBlockWithTxs";
const RPC_METHOD_GET_EVENTS: &str = "starknet_getEvents";

/// Read operations against a monotonic append-only block source.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Returns the hash and number of the chain head.
	async fn latest_block(&self) -> Result<BlockHashAndNumber, RpcError>;

	/// Resolves a block hash to its block number.
	async fn block_number_of(&self, block_hash: &str) -> Result<u64, RpcError>;

	/// Fetches the events matching `filter`.
	async fn get_events(&self, filter: &EventFilter) -> Result<Vec<ChainEvent>, RpcError>;
}

/// Starknet client over a pluggable transport.
#[derive(Clone)]
pub struct StarknetClient<T: RpcTransport> {
	transport: T,
}

impl StarknetClient<HttpRpcTransport> {
	/// Creates a client for the given node URL.
	pub fn new(node_url: &str) -> Result<Self, RpcError> {
		Ok(Self::with_transport(HttpRpcTransport::new(node_url)?))
	}
}

impl<T: RpcTransport> StarknetClient<T> {
	/// Creates a client over a specific transport.
	pub fn with_transport(transport: T) -> Self {
		Self { transport }
	}
}

#[async_trait]
impl<T: RpcTransport> ChainClient for StarknetClient<T> {
	#[instrument(skip(self))]
	async fn latest_block(&self) -> Result<BlockHashAndNumber, RpcError> {
		let result = self
			.transport
			.send_request(RPC_METHOD_BLOCK_HASH_AND_NUMBER, json!([]))
			.await?;

		serde_json::from_value(result).map_err(|e| {
			RpcError::protocol_error(
				"failed to decode block hash and number",
				Some(Box::new(e)),
				None,
			)
		})
	}

	#[instrument(skip(self))]
	async fn block_number_of(&self, block_hash: &str) -> Result<u64, RpcError> {
		let result = self
			.transport
			.send_request(
				RPC_METHOD_GET_BLOCK_WITH_TXS,
				json!([{ "block_hash": block_hash }]),
			)
			.await?;

		result
			.get("block_number")
			.and_then(|n| n.as_u64())
			.ok_or_else(|| {
				RpcError::protocol_error(
					format!("block {} has no block_number member", block_hash),
					None,
					None,
				)
			})
	}

	#[instrument(skip(self, filter))]
	async fn get_events(&self, filter: &EventFilter) -> Result<Vec<ChainEvent>, RpcError> {
		let params = serde_json::to_value(filter).map_err(|e| {
			RpcError::protocol_error("failed to serialize event filter", Some(Box::new(e)), None)
		})?;

		let result = self
			.transport
			.send_request(RPC_METHOD_GET_EVENTS, json!([params]))
			.await?;

		let page: EventsPage = serde_json::from_value(result).map_err(|e| {
			RpcError::protocol_error("failed to decode events page", Some(Box::new(e)), None)
		})?;

		// A non-empty token means the range holds more than chunk_size events;
		// the remainder is not fetched. Surfaced in the logs so operators can
		// raise chunk_size or shrink batch_size.
		if let Some(token) = page.continuation_token.as_deref().filter(|t| !t.is_empty()) {
			tracing::warn!(
				continuation_token = token,
				"event page truncated, remaining events in range are not fetched"
			);
		}

		Ok(page.events)
	}
}
