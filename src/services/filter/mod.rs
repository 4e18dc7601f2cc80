//! Selector matching for emitted events.
//!
//! A pure predicate over an event's key list: the configured selector matches
//! a key either exactly or, when partial matching is enabled, by substring in
//! either direction.

/// Options controlling selector comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
	/// Fold both sides to lowercase before comparing
	pub case_insensitive: bool,
	/// Accept substring matches in either direction
	pub partial_match: bool,
}

impl Default for MatchOptions {
	fn default() -> Self {
		Self {
			case_insensitive: true,
			partial_match: true,
		}
	}
}

/// Returns the first event key matching `target`, in iteration order.
///
/// An empty target never matches; a selector misconfiguration must not
/// dispatch every event. The returned key is the original, un-normalized
/// candidate.
pub fn match_selector<'a>(
	event_keys: &'a [String],
	target: &str,
	options: &MatchOptions,
) -> Option<&'a str> {
	if target.is_empty() {
		return None;
	}

	let normalized_target = normalize(target, options);

	for key in event_keys {
		let normalized_key = normalize(key, options);

		if normalized_key == normalized_target {
			return Some(key);
		}

		if options.partial_match
			&& (normalized_key.contains(&normalized_target)
				|| normalized_target.contains(&normalized_key))
		{
			return Some(key);
		}
	}

	None
}

fn normalize(value: &str, options: &MatchOptions) -> String {
	if options.case_insensitive {
		value.to_lowercase()
	} else {
		value.to_string()
	}
}
