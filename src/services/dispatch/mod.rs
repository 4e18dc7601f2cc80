//! Event dispatch: launch gating and worker materialization.
//!
//! - `gate`: global inter-launch spacing
//! - `materializer`: event → worker spec translation
//! - `service`: the dispatch pipeline tying matcher, gate and backend together

mod gate;
mod materializer;
mod service;

pub use gate::LaunchGate;
pub use materializer::{
	build_emitted_spec, build_generic_spec, sanitize_label_value, worker_name, WorkerTemplate,
	APP_LABEL_VALUE, EMITTED_EVENT_TYPE, GENERIC_APP_LABEL_VALUE,
};
pub use service::{DispatchService, EventSink};
