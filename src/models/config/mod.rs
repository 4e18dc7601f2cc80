//! Dispatcher configuration assembled from flags and environment variables.

mod error;

pub use error::ConfigError;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

use crate::models::chain::ChainConfig;

/// Environment variable names treated as credentials.
///
/// These are never copied into a worker's environment by value; workers
/// receive them by reference to [`API_KEYS_SECRET_NAME`].
pub const CREDENTIAL_ENV_VARS: [&str; 3] =
	["ANTHROPIC_API_KEY", "OPENAI_API_KEY", "OPENROUTER_API_KEY"];

/// Name of the secret object holding worker API credentials.
pub const API_KEYS_SECRET_NAME: &str = "agent-api-keys";

/// `(env var, secret key)` pairs mapping credentials to secret entries.
pub const API_KEY_SECRET_ENTRIES: [(&str, &str); 3] = [
	("ANTHROPIC_API_KEY", "anthropic-api-key"),
	("OPENAI_API_KEY", "openai-api-key"),
	("OPENROUTER_API_KEY", "openrouter-api-key"),
];

/// Which workload substrate hosts the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum BackendKind {
	/// Kubernetes batch jobs
	Kubernetes,
	/// Docker containers
	Docker,
}

/// API credentials captured once at startup.
///
/// Held only so startup logging can report their presence; the values are
/// never forwarded to workers.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
	pub anthropic_api_key: Option<String>,
	pub openai_api_key: Option<String>,
	pub openrouter_api_key: Option<String>,
}

impl ApiCredentials {
	/// Reads the credential variables from the process environment.
	pub fn from_env() -> Self {
		Self {
			anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|v| !v.is_empty()),
			openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
			openrouter_api_key: env::var("OPENROUTER_API_KEY").ok().filter(|v| !v.is_empty()),
		}
	}

	/// Returns the names of credentials that are not set.
	pub fn missing(&self) -> Vec<&'static str> {
		let mut missing = Vec::new();
		if self.anthropic_api_key.is_none() {
			missing.push("ANTHROPIC_API_KEY");
		}
		if self.openai_api_key.is_none() {
			missing.push("OPENAI_API_KEY");
		}
		if self.openrouter_api_key.is_none() {
			missing.push("OPENROUTER_API_KEY");
		}
		missing
	}
}

/// Complete, validated dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	/// Chain endpoint to poll
	pub chain: ChainConfig,
	/// Contract address whose events are watched
	pub contract_address: String,
	/// Event selector matched against emitted keys
	pub selector: String,
	/// Starting block; 0 means resolve the chain head at startup
	pub start_block: u64,
	/// Case-insensitive selector comparison
	pub case_insensitive: bool,
	/// Allow substring selector matches
	pub partial_match: bool,
	/// Maximum blocks per `starknet_getEvents` call
	pub batch_size: u64,
	/// Maximum events per response page
	pub chunk_size: u32,
	/// Workload substrate hosting the workers
	pub backend: BackendKind,
	/// Namespace or scope for created workers
	pub namespace: String,
	/// Image reference for worker containers
	pub agent_image: String,
	/// Optional service identity assumed by workers
	pub service_account: Option<String>,
	/// Optional cluster-config path (Kubernetes backend only)
	pub kubeconfig: Option<PathBuf>,
	/// Minimum spacing between worker launches
	pub launch_interval: Duration,
	/// Control plane bind address
	pub listen_address: String,
}

impl DispatcherConfig {
	/// Validates the configuration, returning the first violation found.
	pub fn validate(&self) -> Result<(), ConfigError> {
		Url::parse(&self.chain.node_url).map_err(|e| {
			ConfigError::parse_error(
				format!("invalid node URL: {}", self.chain.node_url),
				Some(Box::new(e)),
				None,
			)
		})?;

		if self.contract_address.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"contract address must not be empty",
				None,
				None,
			));
		}

		if self.selector.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"event selector must not be empty",
				None,
				None,
			));
		}

		if self.batch_size == 0 {
			return Err(ConfigError::validation_error(
				"batch size must be greater than zero",
				None,
				None,
			));
		}

		if self.chunk_size == 0 {
			return Err(ConfigError::validation_error(
				"chunk size must be greater than zero",
				None,
				None,
			));
		}

		if self.namespace.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"worker namespace must not be empty",
				None,
				None,
			));
		}

		self.listen_address.parse::<SocketAddr>().map_err(|e| {
			ConfigError::parse_error(
				format!("invalid listen address: {}", self.listen_address),
				Some(Box::new(e)),
				Some(HashMap::from([(
					"flag".to_string(),
					"listen-address".to_string(),
				)])),
			)
		})?;

		Ok(())
	}
}
