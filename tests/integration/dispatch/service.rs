//! Integration tests for the dispatch pipeline: at-most-once dispatch and
//! launch spacing.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use starknet_agent_dispatcher::{
	models::MatchedEvent,
	services::{backend::BackendError, dispatch::EventSink},
};

use crate::integration::mocks::{
	chain_event, dispatch_service, worker_handle, MockBackend, TEST_SELECTOR,
};

#[tokio::test]
async fn test_duplicate_event_id_creates_at_most_once() {
	let mut backend = MockBackend::new();
	let mut successes = 0u32;
	backend.expect_create().times(2).returning(move |spec| {
		if successes == 0 {
			successes += 1;
			Ok(worker_handle(&spec.name))
		} else {
			Err(BackendError::already_exists(
				format!("job {} already exists", spec.name),
				None,
				None,
			))
		}
	});

	let dispatcher = dispatch_service(Arc::new(backend), Duration::ZERO);
	let event = chain_event(110, "0x7f3a", 0, &[TEST_SELECTOR]);

	// The duplicate is dropped with a warning, not an error.
	dispatcher.handle_event(&event).await;
	dispatcher.handle_event(&event).await;
}

#[tokio::test]
async fn test_unmatched_event_never_reaches_backend() {
	let mut backend = MockBackend::new();
	backend.expect_create().times(0);

	let dispatcher = dispatch_service(Arc::new(backend), Duration::ZERO);
	let event = chain_event(110, "0x7f3a", 0, &["0xAAAA", "0xBBBB"]);

	dispatcher.handle_event(&event).await;
}

#[tokio::test]
async fn test_backend_failure_drops_event_without_panic() {
	let mut backend = MockBackend::new();
	backend.expect_create().times(1).returning(|_| {
		Err(BackendError::unavailable("substrate down", None, None))
	});

	let dispatcher = dispatch_service(Arc::new(backend), Duration::ZERO);
	let event = chain_event(110, "0x7f3a", 0, &[TEST_SELECTOR]);

	dispatcher.handle_event(&event).await;
}

#[tokio::test(start_paused = true)]
async fn test_launches_are_spaced_by_the_gate() {
	let stamps: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

	let mut backend = MockBackend::new();
	let recorded = stamps.clone();
	backend.expect_create().times(2).returning(move |spec| {
		recorded.lock().unwrap().push(Instant::now());
		Ok(worker_handle(&spec.name))
	});

	let dispatcher = dispatch_service(Arc::new(backend), Duration::from_secs(30));

	let first = chain_event(110, "0x7f3a", 0, &[TEST_SELECTOR]);
	let second = chain_event(110, "0x7f3a", 1, &[TEST_SELECTOR]);

	dispatcher.handle_event(&first).await;
	tokio::time::advance(Duration::from_millis(200)).await;
	dispatcher.handle_event(&second).await;

	let stamps = stamps.lock().unwrap();
	assert_eq!(stamps.len(), 2);
	assert!(
		stamps[1] - stamps[0] >= Duration::from_secs(30),
		"second launch started {:?} after the first",
		stamps[1] - stamps[0]
	);
}

#[tokio::test]
async fn test_generic_dispatch_creates_worker() {
	let mut backend = MockBackend::new();
	backend
		.expect_create()
		.times(1)
		.withf(|spec| {
			spec.labels.get("app").map(String::as_str) == Some("chairman-agent-generic")
				&& spec.env.iter().any(|var| var.name == "EVENT_PAYLOAD_JSON")
		})
		.returning(|spec| Ok(worker_handle(&spec.name)));

	let dispatcher = dispatch_service(Arc::new(backend), Duration::ZERO);

	let event = MatchedEvent {
		event_id: "external-event-7".to_string(),
		event_type: "custom".to_string(),
		payload: serde_json::Map::new(),
		environment: Default::default(),
	};

	let handle = dispatcher.dispatch_generic(&event).await.unwrap();
	assert_eq!(handle.name, "agent-external-event-7");
}
