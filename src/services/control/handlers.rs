//! Control plane request handlers.
//!
//! Backend errors map onto HTTP statuses: not-found becomes 404,
//! invalid input 400, duplicate workers 409, anything else 500. The
//! substrate's message is included verbatim in the body.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
	models::{BackendKind, MatchedEvent, WorkerHandle, WorkerStatus},
	services::{
		backend::{BackendError, LogStreamOptions, LABEL_EVENT_ID},
		control::{logs::bridge_session, AppState},
		dispatch::sanitize_label_value,
	},
};

/// JSON field naming the worker, per substrate.
fn worker_key(kind: BackendKind) -> &'static str {
	match kind {
		BackendKind::Kubernetes => "jobName",
		BackendKind::Docker => "containerID",
	}
}

fn error_response(err: &BackendError) -> HttpResponse {
	let body = json!({ "error": err.to_string() });
	match err {
		BackendError::NotFound(_) => HttpResponse::NotFound().json(body),
		BackendError::InvalidSpec(_) => HttpResponse::BadRequest().json(body),
		BackendError::AlreadyExists(_) => HttpResponse::Conflict().json(body),
		_ => HttpResponse::InternalServerError().json(body),
	}
}

fn handle_body(state: &AppState, handle: &WorkerHandle, event_id: &str) -> Value {
	let mut body = Map::new();
	body.insert(
		worker_key(state.backend.kind()).to_string(),
		json!(handle.name),
	);
	body.insert("namespace".to_string(), json!(handle.namespace));
	body.insert("status".to_string(), json!("Created"));
	body.insert("eventId".to_string(), json!(event_id));
	Value::Object(body)
}

fn status_body(state: &AppState, name: &str, status: &WorkerStatus) -> Value {
	let mut body = Map::new();
	body.insert(worker_key(state.backend.kind()).to_string(), json!(name));
	body.insert("namespace".to_string(), json!(state.namespace));
	body.insert("status".to_string(), json!(status.phase.to_string()));
	body.insert("createdAt".to_string(), json!(status.created_at));
	body.insert("startedAt".to_string(), json!(status.started_at));
	body.insert("completedAt".to_string(), json!(status.completed_at));
	body.insert("eventId".to_string(), json!(status.event_id));

	if let Some(counters) = &status.counters {
		body.insert("activePods".to_string(), json!(counters.active));
		body.insert("succeededPods".to_string(), json!(counters.succeeded));
		body.insert("failedPods".to_string(), json!(counters.failed));
	}

	Value::Object(body)
}

/// `POST /event`: materializes a generic worker from the request body.
pub async fn create_worker(
	state: web::Data<AppState>,
	event: web::Json<MatchedEvent>,
) -> impl Responder {
	let event = event.into_inner();
	if event.event_id.trim().is_empty() {
		return HttpResponse::BadRequest().json(json!({ "error": "event_id must not be empty" }));
	}

	match state.dispatcher.dispatch_generic(&event).await {
		Ok(handle) => HttpResponse::Ok().json(handle_body(&state, &handle, &event.event_id)),
		Err(err) => error_response(&err),
	}
}

/// `GET /jobs/{name}/status` and `GET /containers/{id}`.
pub async fn worker_status(
	state: web::Data<AppState>,
	path: web::Path<String>,
) -> impl Responder {
	let name = path.into_inner();
	match state.backend.status(&name).await {
		Ok(status) => HttpResponse::Ok().json(status_body(&state, &name, &status)),
		Err(err) => error_response(&err),
	}
}

/// `DELETE /jobs/{name}` and `DELETE /containers/{id}`.
pub async fn delete_worker(
	state: web::Data<AppState>,
	path: web::Path<String>,
) -> impl Responder {
	let name = path.into_inner();
	match state.backend.delete(&name).await {
		Ok(()) => HttpResponse::Ok().json(json!({
			"status": "success",
			"message": format!("worker {} marked for deletion", name),
		})),
		Err(err) => error_response(&err),
	}
}

/// `GET /containers/name/{name}`: resolves a display name to a handle.
pub async fn resolve_worker_name(
	state: web::Data<AppState>,
	path: web::Path<String>,
) -> impl Responder {
	let name = path.into_inner();
	match state.backend.find_by_name(&name).await {
		Ok(handle) => {
			let mut body = Map::new();
			body.insert(
				worker_key(state.backend.kind()).to_string(),
				json!(handle.name),
			);
			body.insert("name".to_string(), json!(name));
			body.insert("namespace".to_string(), json!(handle.namespace));
			HttpResponse::Ok().json(Value::Object(body))
		}
		Err(err) => error_response(&err),
	}
}

/// `DELETE /signal-death/{event_id}`: terminates every worker labelled with
/// the sanitized event id.
///
/// A worker that disappears mid-fan-out is not an error; 200 is returned as
/// long as no deletion failed for another reason.
pub async fn signal_death(
	state: web::Data<AppState>,
	path: web::Path<String>,
) -> impl Responder {
	let event_id = path.into_inner();
	if event_id.trim().is_empty() {
		return HttpResponse::BadRequest()
			.json(json!({ "error": "missing event_id parameter" }));
	}

	let sanitized = sanitize_label_value(&event_id);
	tracing::info!(event_id = %event_id, sanitized = %sanitized, "received death signal");

	let workers = match state.backend.list_by_label(LABEL_EVENT_ID, &sanitized).await {
		Ok(workers) => workers,
		Err(err) => {
			return HttpResponse::InternalServerError().json(json!({
				"error": format!("failed to list workers for event id {}", sanitized),
				"event_id": event_id,
				"sanitized": sanitized,
				"cause": err.to_string(),
			}));
		}
	};

	if workers.is_empty() {
		return HttpResponse::NotFound().json(json!({
			"error": format!("no worker found for event id {}", sanitized),
			"event_id": event_id,
			"sanitized": sanitized,
		}));
	}

	let mut deleted = Vec::new();
	let mut failures = Vec::new();
	for worker in &workers {
		match state.backend.delete(&worker.name).await {
			Ok(()) => deleted.push(worker.name.clone()),
			Err(err) if err.is_not_found() => {
				tracing::warn!(
					worker = %worker.name,
					"worker vanished during death-signal fan-out"
				);
			}
			Err(err) => {
				failures.push(format!("failed to delete {}: {}", worker.name, err));
			}
		}
	}

	if !failures.is_empty() {
		HttpResponse::InternalServerError().json(json!({
			"message": format!("deletion for event id {} partially failed", sanitized),
			"event_id": event_id,
			"sanitized": sanitized,
			"deleted_jobs": deleted,
			"errors": failures,
		}))
	} else {
		HttpResponse::Ok().json(json!({
			"message": format!("triggered deletion for workers of event id {}", sanitized),
			"event_id": event_id,
			"sanitized": sanitized,
			"deleted_jobs": deleted,
		}))
	}
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
	tail: Option<i64>,
	follow: Option<bool>,
}

/// `GET /jobs/{name}/logs` and `GET /containers/{id}/logs`: upgrades to a
/// WebSocket and bridges the backend log stream onto it.
pub async fn stream_worker_logs(
	req: HttpRequest,
	body: web::Payload,
	state: web::Data<AppState>,
	path: web::Path<String>,
	query: web::Query<LogsQuery>,
) -> actix_web::Result<HttpResponse> {
	let name = path.into_inner();
	let options = LogStreamOptions {
		follow: query.follow.unwrap_or(true),
		tail: query.tail.filter(|tail| *tail > 0).unwrap_or(100),
	};

	// Open the backend stream before upgrading so failures still map onto
	// plain HTTP statuses.
	let logs = match state.backend.stream_logs(&name, &options).await {
		Ok(logs) => logs,
		Err(err) => return Ok(error_response(&err)),
	};

	let (response, session, messages) = actix_ws::handle(&req, body)?;
	actix_web::rt::spawn(bridge_session(session, messages, logs));

	Ok(response)
}
