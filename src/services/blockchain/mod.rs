//! Chain RPC client services.
//!
//! - `client`: typed Starknet JSON-RPC wrappers
//! - `transport`: retryable HTTP JSON-RPC transport
//! - `error`: RPC error taxonomy

mod client;
mod error;
mod transport;

pub use client::{ChainClient, StarknetClient};
pub use error::RpcError;
pub use transport::{HttpRpcTransport, RpcTransport};
