//! Cross-cutting utilities.
//!
//! - `http`: retryable HTTP client construction
//! - `logging`: tracing setup and structured error context

mod http;
pub mod logging;

pub use http::{create_retryable_http_client, RetryConfig, TransientErrorRetryStrategy};
pub use logging::{mask_credential, setup_logging};
