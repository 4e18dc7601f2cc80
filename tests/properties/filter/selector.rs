//! Property-based tests for the selector matcher laws.

use proptest::prelude::*;
use starknet_agent_dispatcher::services::filter::{match_selector, MatchOptions};

fn key_strategy() -> impl Strategy<Value = String> {
	"0[xX][0-9a-fA-F]{1,16}"
}

fn keys_strategy() -> impl Strategy<Value = Vec<String>> {
	prop::collection::vec(key_strategy(), 0..6)
}

proptest! {
	/// A match is invariant under a consistent case fold of keys and target
	/// when matching case-insensitively.
	#[test]
	fn prop_case_insensitive_matching_is_fold_invariant(
		keys in keys_strategy(),
		target in key_strategy(),
		partial_match in any::<bool>(),
	) {
		let options = MatchOptions { case_insensitive: true, partial_match };

		let folded_keys: Vec<String> = keys.iter().map(|k| k.to_uppercase()).collect();
		let folded_target = target.to_uppercase();

		prop_assert_eq!(
			match_selector(&keys, &target, &options).is_some(),
			match_selector(&folded_keys, &folded_target, &options).is_some()
		);
	}

	/// With partial matching on, a match exists iff some key and the target
	/// are substrings of each other in either direction.
	#[test]
	fn prop_partial_match_substring_law(
		keys in keys_strategy(),
		target in key_strategy(),
	) {
		let options = MatchOptions { case_insensitive: true, partial_match: true };

		let target_folded = target.to_lowercase();
		let expected = keys.iter().any(|key| {
			let key_folded = key.to_lowercase();
			key_folded.contains(&target_folded) || target_folded.contains(&key_folded)
		});

		prop_assert_eq!(match_selector(&keys, &target, &options).is_some(), expected);
	}

	/// With partial matching off, only normalized equality matches.
	#[test]
	fn prop_exact_match_law(
		keys in keys_strategy(),
		target in key_strategy(),
	) {
		let options = MatchOptions { case_insensitive: true, partial_match: false };

		let target_folded = target.to_lowercase();
		let expected = keys.iter().any(|key| key.to_lowercase() == target_folded);

		prop_assert_eq!(match_selector(&keys, &target, &options).is_some(), expected);
	}

	/// The first candidate satisfying the predicate wins.
	#[test]
	fn prop_first_candidate_wins(
		keys in keys_strategy(),
		target in key_strategy(),
		partial_match in any::<bool>(),
	) {
		let options = MatchOptions { case_insensitive: true, partial_match };

		let target_folded = target.to_lowercase();
		let reference = keys.iter().find(|key| {
			let key_folded = key.to_lowercase();
			key_folded == target_folded
				|| (partial_match
					&& (key_folded.contains(&target_folded)
						|| target_folded.contains(&key_folded)))
		});

		prop_assert_eq!(
			match_selector(&keys, &target, &options),
			reference.map(String::as_str)
		);
	}

	/// An empty target never matches anything.
	#[test]
	fn prop_empty_target_never_matches(keys in keys_strategy()) {
		prop_assert_eq!(match_selector(&keys, "", &MatchOptions::default()), None);
	}
}
