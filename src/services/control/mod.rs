//! Control plane: worker status, deletion, log streaming and death signals.
//!
//! - `server`: actix-web application wiring
//! - `handlers`: request handlers
//! - `logs`: WebSocket log bridge

pub mod handlers;
mod logs;
mod server;

pub use logs::{forward_logs, LogSink};
pub use server::{create_control_server, AppState};
