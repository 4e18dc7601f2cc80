//! Domain models and data structures for the dispatcher.
//!
//! - `chain`: Starknet wire shapes (block refs, filters, events)
//! - `config`: dispatcher configuration and credentials
//! - `event`: control-plane event payloads
//! - `worker`: worker specs, handles and statuses

mod chain;
mod config;
mod event;
mod worker;

pub use chain::{
	BlockHashAndNumber, BlockRef, ChainConfig, ChainEvent, EventFilter, EventsPage,
};
pub use config::{
	ApiCredentials, BackendKind, ConfigError, DispatcherConfig, API_KEYS_SECRET_NAME,
	API_KEY_SECRET_ENTRIES, CREDENTIAL_ENV_VARS,
};
pub use event::MatchedEvent;
pub use worker::{
	EnvVar, SecretEnvVar, WorkerCounters, WorkerHandle, WorkerPhase, WorkerSpec, WorkerStatus,
};
