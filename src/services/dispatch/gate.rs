//! Global launch gate.
//!
//! Serializes worker launches across every poller and control-plane path and
//! enforces a minimum spacing between them. The wait happens inside the
//! critical section: the contract is that at most one launch *starts* per
//! interval.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Mutex plus monotonic clock enforcing minimum inter-launch spacing.
pub struct LaunchGate {
	interval: Duration,
	last_launch_at: Mutex<Instant>,
}

impl LaunchGate {
	/// Creates a gate with the given minimum spacing.
	///
	/// The clock starts one interval in the past so the first launch passes
	/// without waiting.
	pub fn new(interval: Duration) -> Self {
		let last_launch_at = Instant::now()
			.checked_sub(interval)
			.unwrap_or_else(Instant::now);

		Self {
			interval,
			last_launch_at: Mutex::new(last_launch_at),
		}
	}

	/// Blocks until this caller is allowed to launch, then stamps the clock.
	pub async fn acquire(&self) {
		let mut last_launch_at = self.last_launch_at.lock().await;

		let elapsed = last_launch_at.elapsed();
		if elapsed < self.interval {
			sleep(self.interval - elapsed).await;
		}

		*last_launch_at = Instant::now();
	}

	/// The configured minimum spacing.
	pub fn interval(&self) -> Duration {
		self.interval
	}
}
