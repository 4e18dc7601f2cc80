//! HTTP JSON-RPC transport for the chain client.
//!
//! A thin wrapper over a retryable `reqwest` client: one endpoint, JSON-RPC
//! 2.0 envelopes, 30 second total timeout per call. Connection pooling is
//! whatever the HTTP implementation provides.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::HashMap, time::Duration};
use url::Url;

use crate::{
	services::blockchain::error::RpcError,
	utils::{create_retryable_http_client, RetryConfig},
};

/// Total timeout for a single RPC call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
	jsonrpc: &'static str,
	method: &'a str,
	params: Value,
	id: u32,
}

/// Sends JSON-RPC requests and returns the raw `result` member.
#[async_trait]
pub trait RpcTransport: Send + Sync {
	async fn send_request(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// HTTP implementation of [`RpcTransport`] against a single node URL.
#[derive(Clone, Debug)]
pub struct HttpRpcTransport {
	client: ClientWithMiddleware,
	url: Url,
}

impl HttpRpcTransport {
	/// Creates a transport for the given node URL.
	pub fn new(node_url: &str) -> Result<Self, RpcError> {
		let url = Url::parse(node_url).map_err(|e| {
			RpcError::transport_error(
				format!("invalid node URL: {}", node_url),
				Some(Box::new(e)),
				None,
			)
		})?;

		let base_client = reqwest::ClientBuilder::new()
			.timeout(REQUEST_TIMEOUT)
			.connect_timeout(CONNECT_TIMEOUT)
			.build()
			.map_err(|e| {
				RpcError::transport_error("failed to create HTTP client", Some(Box::new(e)), None)
			})?;

		Ok(Self {
			client: create_retryable_http_client(&RetryConfig::default(), base_client),
			url,
		})
	}

	/// The node URL this transport talks to.
	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
	async fn send_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
		let request = JsonRpcRequest {
			jsonrpc: "2.0",
			method,
			params,
			id: 1,
		};

		tracing::debug!(method, "sending chain RPC request");

		let response = self
			.client
			.post(self.url.clone())
			.json(&request)
			.send()
			.await
			.map_err(|e| {
				RpcError::transport_error(
					format!("request for {} failed", method),
					Some(Box::new(e)),
					Some(HashMap::from([(
						"method".to_string(),
						method.to_string(),
					)])),
				)
			})?;

		let status = response.status();
		if !status.is_success() {
			return Err(RpcError::transport_error(
				format!("request for {} returned HTTP {}", method, status.as_u16()),
				None,
				Some(HashMap::from([(
					"status".to_string(),
					status.as_u16().to_string(),
				)])),
			));
		}

		let body: Value = response.json().await.map_err(|e| {
			RpcError::protocol_error(
				format!("response for {} is not valid JSON", method),
				Some(Box::new(e)),
				None,
			)
		})?;

		if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
			let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
			let message = error
				.get("message")
				.and_then(|m| m.as_str())
				.unwrap_or("unknown RPC error");
			return Err(RpcError::remote_error(code, message, method));
		}

		body.get("result").cloned().ok_or_else(|| {
			RpcError::protocol_error(
				format!("response for {} has no result member", method),
				None,
				None,
			)
		})
	}
}
