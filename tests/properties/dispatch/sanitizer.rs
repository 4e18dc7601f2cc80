//! Property-based tests for label sanitization.

use proptest::prelude::*;
use starknet_agent_dispatcher::services::dispatch::{sanitize_label_value, worker_name};

/// True when `value` satisfies the label value grammar the sanitizer
/// guarantees: bounded length, restricted alphabet, alphanumeric first
/// character and no trailing separators.
fn is_valid_label(value: &str) -> bool {
	if value.is_empty() || value.len() > 63 {
		return false;
	}

	let mut chars = value.chars();
	let first = chars.next().unwrap();
	if !first.is_ascii_alphanumeric() {
		return false;
	}

	if !value
		.chars()
		.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
	{
		return false;
	}

	!value.ends_with('-') && !value.ends_with('.')
}

proptest! {
	#[test]
	fn prop_sanitize_output_is_label_compliant(input in "\\PC{0,100}") {
		let sanitized = sanitize_label_value(&input);
		prop_assert!(
			sanitized == "invalid-label" || is_valid_label(&sanitized),
			"output {:?} violates the label grammar",
			sanitized
		);
	}

	#[test]
	fn prop_sanitize_is_idempotent(input in "\\PC{0,100}") {
		let once = sanitize_label_value(&input);
		let twice = sanitize_label_value(&once);
		prop_assert_eq!(once, twice);
	}

	#[test]
	fn prop_sanitize_is_idempotent_on_event_id_shapes(
		block in any::<u64>(),
		tx in "0[xX][0-9a-fA-F]{1,64}",
		index in any::<u32>(),
	) {
		let event_id = format!("starknet-emitted-{}-{}-{}", block, tx, index);
		let once = sanitize_label_value(&event_id);
		prop_assert_eq!(sanitize_label_value(&once), once.clone());
		prop_assert!(is_valid_label(&once));
	}

	#[test]
	fn prop_sanitize_is_deterministic(input in "\\PC{0,100}") {
		prop_assert_eq!(sanitize_label_value(&input), sanitize_label_value(&input));
	}

	#[test]
	fn prop_worker_name_is_bounded(input in "\\PC{0,100}") {
		let name = worker_name(&sanitize_label_value(&input));
		prop_assert!(name.len() <= 50);
		prop_assert!(name.starts_with("agent"));
		prop_assert!(!name.ends_with('-'));
	}
}
