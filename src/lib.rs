//! Event-driven workload dispatcher.
//!
//! Bridges a Starknet JSON-RPC endpoint to a workload substrate: polls the
//! chain for new blocks, matches emitted events against a configured
//! selector, and materializes one isolated worker per matched event. A
//! control plane exposes worker status, deletion, log streaming and
//! event-scoped termination.
//!
//! # Module Structure
//!
//! - `bootstrap`: wires services together at startup
//! - `models`: chain, worker, event and configuration data structures
//! - `services`: the dispatch pipeline and its collaborators
//! - `utils`: logging setup, error context and HTTP helpers

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
