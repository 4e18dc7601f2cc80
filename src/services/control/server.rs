//! Control plane HTTP server construction.

use actix_web::{dev::Server, middleware::NormalizePath, web, App, HttpServer};
use std::sync::Arc;

use crate::services::{
	backend::WorkerBackend,
	control::handlers,
	dispatch::DispatchService,
};

/// State shared by every control-plane handler.
///
/// The backend is shared with the dispatch pipeline but carries no mutable
/// dispatcher state.
pub struct AppState {
	pub backend: Arc<dyn WorkerBackend>,
	pub dispatcher: Arc<DispatchService>,
	pub namespace: String,
}

/// Builds the control plane server on `bind_address`.
///
/// Fails only when the listener cannot bind; request-level failures are
/// reported per request.
pub fn create_control_server(
	bind_address: &str,
	state: AppState,
) -> std::io::Result<Server> {
	let state = web::Data::new(state);

	tracing::info!(address = %bind_address, "starting control plane");

	Ok(HttpServer::new(move || {
		App::new()
			.wrap(NormalizePath::trim())
			.app_data(state.clone())
			.route("/event", web::post().to(handlers::create_worker))
			.route(
				"/jobs/{name}/status",
				web::get().to(handlers::worker_status),
			)
			.route(
				"/jobs/{name}/logs",
				web::get().to(handlers::stream_worker_logs),
			)
			.route("/jobs/{name}", web::delete().to(handlers::delete_worker))
			.route(
				"/signal-death/{event_id}",
				web::delete().to(handlers::signal_death),
			)
			// Registered ahead of /containers/{id} so "name" is not taken
			// for a container id.
			.route(
				"/containers/name/{name}",
				web::get().to(handlers::resolve_worker_name),
			)
			.route(
				"/containers/{id}/logs",
				web::get().to(handlers::stream_worker_logs),
			)
			.route("/containers/{id}", web::get().to(handlers::worker_status))
			.route(
				"/containers/{id}",
				web::delete().to(handlers::delete_worker),
			)
	})
	.bind(bind_address)?
	.run())
}
