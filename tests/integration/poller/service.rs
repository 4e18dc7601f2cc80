//! Integration tests for the event poller.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use starknet_agent_dispatcher::{
	models::{BlockHashAndNumber, BlockRef, ChainEvent, EventFilter},
	services::{
		blockchain::RpcError,
		dispatch::EventSink,
		poller::{EventPoller, PollerConfig},
	},
};

use crate::integration::mocks::{chain_event, dispatch_service, MockBackend, MockChainClient, TEST_SELECTOR};

/// Sink recording every event it receives.
#[derive(Default)]
struct RecordingSink {
	events: Mutex<Vec<ChainEvent>>,
}

impl RecordingSink {
	fn event_ids(&self) -> Vec<String> {
		self.events
			.lock()
			.unwrap()
			.iter()
			.map(|event| event.event_id())
			.collect()
	}
}

#[async_trait]
impl EventSink for RecordingSink {
	async fn handle_event(&self, event: &ChainEvent) {
		self.events.lock().unwrap().push(event.clone());
	}
}

fn filter(from_block: BlockRef) -> EventFilter {
	EventFilter {
		contract_address: "0x198c".to_string(),
		keys: vec![],
		from_block,
		to_block: BlockRef::Latest,
		chunk_size: 100,
	}
}

fn poller_config() -> PollerConfig {
	PollerConfig {
		batch_size: 30,
		..PollerConfig::default()
	}
}

fn expect_head(chain: &mut MockChainClient, number: u64) {
	chain.expect_latest_block().returning(move || {
		Ok(BlockHashAndNumber {
			block_hash: "0xhead".to_string(),
			block_number: number,
		})
	});
	chain
		.expect_block_number_of()
		.returning(move |_| Ok(number));
}

fn block_range(filter: &EventFilter) -> (u64, u64) {
	let from = match filter.from_block {
		BlockRef::ByNumber(n) => n,
		_ => panic!("expected numeric from_block"),
	};
	let to = match filter.to_block {
		BlockRef::ByNumber(n) => n,
		_ => panic!("expected numeric to_block"),
	};
	(from, to)
}

#[tokio::test]
async fn test_empty_range_advances_cursor_without_dispatch() {
	let mut chain = MockChainClient::new();
	expect_head(&mut chain, 135);
	chain
		.expect_get_events()
		.times(2)
		.returning(|filter| {
			match block_range(filter) {
				(100, 129) | (130, 135) => Ok(vec![]),
				range => panic!("unexpected batch range {:?}", range),
			}
		});

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(100)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	assert_eq!(poller.cursor_position(), Some(100));

	poller.poll_once().await;

	assert_eq!(poller.cursor_position(), Some(136));
	assert!(sink.event_ids().is_empty());
}

#[tokio::test]
async fn test_events_are_dispatched_in_order() {
	let mut chain = MockChainClient::new();
	expect_head(&mut chain, 112);
	chain.expect_get_events().returning(|_| {
		// Deliberately out of order; the poller must sort.
		Ok(vec![
			chain_event(111, "0xccc", 0, &["0xAAAA"]),
			chain_event(110, "0xbbb", 1, &["0xAAAA"]),
			chain_event(110, "0xbbb", 0, &["0xAAAA"]),
		])
	});

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(110)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	poller.poll_once().await;

	assert_eq!(
		sink.event_ids(),
		vec![
			"starknet-emitted-110-0xbbb-0",
			"starknet-emitted-110-0xbbb-1",
			"starknet-emitted-111-0xccc-0",
		]
	);
}

#[tokio::test]
async fn test_head_failure_aborts_tick_without_moving_cursor() {
	let mut chain = MockChainClient::new();
	chain.expect_latest_block().returning(|| {
		Err(RpcError::transport_error("connection refused", None, None))
	});
	chain.expect_get_events().times(0);

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(100)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	poller.poll_once().await;

	assert_eq!(poller.cursor_position(), Some(100));
}

#[tokio::test]
async fn test_batch_failure_keeps_cursor_on_failed_batch() {
	let mut chain = MockChainClient::new();
	expect_head(&mut chain, 170);
	chain.expect_get_events().returning(|filter| {
		match block_range(filter) {
			(100, 129) => Ok(vec![]),
			(130, 159) => Err(RpcError::remote_error(
				-32602,
				"Invalid params",
				"starknet_getEvents",
			)),
			range => panic!("unexpected batch range {:?}", range),
		}
	});

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(100)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	poller.poll_once().await;

	// Progress up to the last successful batch is kept.
	assert_eq!(poller.cursor_position(), Some(130));
}

#[tokio::test]
async fn test_cursor_never_decreases_across_ticks() {
	let mut chain = MockChainClient::new();
	expect_head(&mut chain, 120);
	chain.expect_get_events().returning(|_| Ok(vec![]));

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(100)),
		poller_config(),
	);

	poller.initialize().await.unwrap();

	let mut previous = poller.cursor_position().unwrap();
	for _ in 0..5 {
		poller.poll_once().await;
		let current = poller.cursor_position().unwrap();
		assert!(current >= previous);
		previous = current;
	}
	assert_eq!(previous, 121);
}

#[tokio::test]
async fn test_re_returned_block_is_skipped() {
	let mut chain = MockChainClient::new();

	let mut heads = vec![110u64, 115].into_iter();
	chain.expect_latest_block().returning(move || {
		let number = heads.next().expect("unexpected extra tick");
		Ok(BlockHashAndNumber {
			block_hash: format!("0xhead{}", number),
			block_number: number,
		})
	});
	let mut numbers = vec![110u64, 115].into_iter();
	chain
		.expect_block_number_of()
		.returning(move |_| Ok(numbers.next().expect("unexpected extra resolution")));

	chain.expect_get_events().returning(|filter| {
		match block_range(filter) {
			(100, 110) => Ok(vec![chain_event(105, "0xaaa", 0, &["0xAAAA"])]),
			// The endpoint re-returns the block 105 event out of range.
			(111, 115) => Ok(vec![
				chain_event(105, "0xaaa", 0, &["0xAAAA"]),
				chain_event(112, "0xddd", 0, &["0xAAAA"]),
			]),
			range => panic!("unexpected batch range {:?}", range),
		}
	});

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink.clone(),
		filter(BlockRef::ByNumber(100)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	poller.poll_once().await;
	poller.poll_once().await;

	assert_eq!(
		sink.event_ids(),
		vec!["starknet-emitted-105-0xaaa-0", "starknet-emitted-112-0xddd-0"]
	);
}

#[tokio::test]
async fn test_initializes_cursor_from_latest() {
	let mut chain = MockChainClient::new();
	chain.expect_latest_block().returning(|| {
		Ok(BlockHashAndNumber {
			block_hash: "0xhead".to_string(),
			block_number: 756800,
		})
	});
	chain
		.expect_block_number_of()
		.withf(|hash| hash == "0xhead")
		.returning(|_| Ok(756800));

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink,
		filter(BlockRef::Latest),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	assert_eq!(poller.cursor_position(), Some(756800));
}

#[tokio::test]
async fn test_initialize_failure_is_fatal_for_the_poller() {
	let mut chain = MockChainClient::new();
	chain.expect_latest_block().returning(|| {
		Err(RpcError::transport_error("connection refused", None, None))
	});

	let sink = Arc::new(RecordingSink::default());
	let mut poller = EventPoller::new(
		chain,
		sink,
		filter(BlockRef::Latest),
		poller_config(),
	);

	assert!(poller.initialize().await.is_err());
	assert_eq!(poller.cursor_position(), None);
}

#[tokio::test]
async fn test_matched_event_reaches_backend_once() {
	// Full pipeline: poller → matcher → materializer → backend.
	let mut chain = MockChainClient::new();
	expect_head(&mut chain, 110);
	chain.expect_get_events().returning(|_| {
		Ok(vec![
			chain_event(110, "0x7f3a", 0, &["0xAAAA", TEST_SELECTOR]),
			chain_event(110, "0x7f3a", 1, &["0xAAAA"]),
		])
	});

	let mut backend = MockBackend::new();
	backend
		.expect_create()
		.times(1)
		.withf(|spec| {
			let event_id = spec
				.env
				.iter()
				.find(|var| var.name == "EVENT_ID")
				.map(|var| var.value.as_str());
			event_id == Some("starknet-emitted-110-0x7f3a-0")
				&& spec.labels.get("event-id").map(String::as_str)
					== Some("starknet-emitted-110-0x7f3a-0")
		})
		.returning(|spec| Ok(crate::integration::mocks::worker_handle(&spec.name)));

	let dispatcher = dispatch_service(Arc::new(backend), std::time::Duration::ZERO);
	let mut poller = EventPoller::new(
		chain,
		dispatcher,
		filter(BlockRef::ByNumber(110)),
		poller_config(),
	);

	poller.initialize().await.unwrap();
	poller.poll_once().await;
}
