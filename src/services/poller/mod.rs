//! Chain event polling.
//!
//! - `cursor`: monotonic next-unprocessed block height
//! - `service`: the tick-driven batched scan loop
//! - `error`: poller error types

mod cursor;
mod error;
mod service;

pub use cursor::BlockCursor;
pub use error::PollerError;
pub use service::{EventPoller, PollerConfig};
