//! Retryable HTTP client construction for the chain RPC transport.
//!
//! Wraps `reqwest` with retry middleware so transient failures against the
//! chain endpoint are retried with exponential backoff before surfacing as
//! errors to the poller.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
	default_on_request_failure, default_on_request_success, policies::ExponentialBackoff, Jitter,
	Retryable, RetryableStrategy, RetryTransientMiddleware,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy settings for outbound HTTP requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
	/// Maximum number of retries for transient errors
	pub max_retries: u32,
	/// Base for exponential backoff calculations
	pub base_for_backoff: u32,
	/// Initial backoff duration before the first retry
	pub initial_backoff: Duration,
	/// Maximum backoff duration for retries
	pub max_backoff: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_for_backoff: 2,
			initial_backoff: Duration::from_millis(250),
			max_backoff: Duration::from_secs(10),
		}
	}
}

/// Retries requests that failed transiently, based on the response status.
pub struct TransientErrorRetryStrategy;

impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
		match res {
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}

/// Creates a retryable HTTP client from a base `reqwest` client.
pub fn create_retryable_http_client(
	config: &RetryConfig,
	base_client: reqwest::Client,
) -> ClientWithMiddleware {
	let retry_policy = ExponentialBackoff::builder()
		.jitter(Jitter::Full)
		.base(config.base_for_backoff)
		.retry_bounds(config.initial_backoff, config.max_backoff)
		.build_with_max_retries(config.max_retries);

	ClientBuilder::new(base_client)
		.with(RetryTransientMiddleware::new_with_policy_and_strategy(
			retry_policy,
			TransientErrorRetryStrategy,
		))
		.build()
}
