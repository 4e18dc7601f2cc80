//! Starknet chain data structures.
//!
//! Mirrors the JSON-RPC wire shapes used by the chain client: block
//! references, event filters and emitted events.

use serde::{
	de::{self, Deserializer},
	ser::{SerializeMap, Serializer},
	Deserialize, Serialize,
};

/// Connection details for a Starknet JSON-RPC endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChainConfig {
	/// URL of the JSON-RPC node
	pub node_url: String,
	/// Human-readable network name (e.g. "sepolia"), passed to workers
	pub network_name: String,
}

/// A reference to a block: the chain head, a number, or a hash.
///
/// Serialized explicitly to the three wire forms the RPC accepts:
/// `"latest"`, `{"block_number": N}` or `{"block_hash": "0x..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
	/// The current chain head
	Latest,
	/// A specific block height
	ByNumber(u64),
	/// A specific block hash
	ByHash(String),
}

impl Serialize for BlockRef {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			BlockRef::Latest => serializer.serialize_str("latest"),
			BlockRef::ByNumber(number) => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry("block_number", number)?;
				map.end()
			}
			BlockRef::ByHash(hash) => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry("block_hash", hash)?;
				map.end()
			}
		}
	}
}

impl<'de> Deserialize<'de> for BlockRef {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = serde_json::Value::deserialize(deserializer)?;
		match value {
			serde_json::Value::String(tag) if tag == "latest" => Ok(BlockRef::Latest),
			serde_json::Value::Object(map) => {
				if let Some(number) = map.get("block_number").and_then(|v| v.as_u64()) {
					return Ok(BlockRef::ByNumber(number));
				}
				if let Some(hash) = map.get("block_hash").and_then(|v| v.as_str()) {
					return Ok(BlockRef::ByHash(hash.to_string()));
				}
				Err(de::Error::custom(
					"expected block_number or block_hash member",
				))
			}
			other => Err(de::Error::custom(format!(
				"invalid block reference: {}",
				other
			))),
		}
	}
}

/// Filter passed to `starknet_getEvents` as its single positional parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFilter {
	/// Contract whose events are scanned
	#[serde(rename = "address")]
	pub contract_address: String,
	/// Key patterns, one disjunction per key position; empty matches anything
	pub keys: Vec<Vec<String>>,
	/// First block of the scanned range
	pub from_block: BlockRef,
	/// Last block of the scanned range
	pub to_block: BlockRef,
	/// Maximum events returned per response page
	pub chunk_size: u32,
}

impl EventFilter {
	/// Returns a copy of this filter scoped to the block range `[from, to]`.
	pub fn with_block_range(&self, from: u64, to: u64) -> Self {
		Self {
			from_block: BlockRef::ByNumber(from),
			to_block: BlockRef::ByNumber(to),
			..self.clone()
		}
	}
}

/// An event emitted by a contract, as returned by `starknet_getEvents`.
///
/// `(block_number, transaction_hash, event_index)` is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainEvent {
	pub block_number: u64,
	pub block_hash: String,
	pub transaction_hash: String,
	pub from_address: String,
	pub keys: Vec<String>,
	pub data: Vec<String>,
	#[serde(default)]
	pub event_index: u32,
}

impl ChainEvent {
	/// Derives the deterministic dispatcher-wide identity for this event.
	pub fn event_id(&self) -> String {
		format!(
			"starknet-emitted-{}-{}-{}",
			self.block_number, self.transaction_hash, self.event_index
		)
	}
}

/// Result of `starknet_blockHashAndNumber`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockHashAndNumber {
	pub block_hash: String,
	pub block_number: u64,
}

/// Result envelope of `starknet_getEvents`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsPage {
	pub events: Vec<ChainEvent>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub continuation_token: Option<String>,
}
