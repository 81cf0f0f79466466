//! Bounded retry with exponential backoff for transient request failures.

// self
use crate::_prelude::*;

/// Failure shape the retry policy decides on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
	/// The caller aborted the request.
	Cancelled,
	/// No response was received.
	Network,
	/// A response arrived with a non-success status.
	Status(u16),
}
impl FailureClass {
	/// Returns `true` for network failures and 5xx responses.
	pub const fn is_transient(self) -> bool {
		match self {
			Self::Cancelled => false,
			Self::Network => true,
			Self::Status(status) => matches!(status, 500..=599),
		}
	}
}

/// Decides whether a failed request is resubmitted and after how long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Maximum number of retries per logical request; zero disables retrying.
	pub budget: u32,
	/// Delay before the first retry.
	pub base_delay: Duration,
	/// Upper bound for any single delay.
	pub max_delay: Duration,
}
impl RetryPolicy {
	const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(300);
	const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(3_000);

	/// Creates a policy allowing `budget` retries with the default 300ms/3s backoff.
	pub const fn new(budget: u32) -> Self {
		Self { budget, base_delay: Self::DEFAULT_BASE_DELAY, max_delay: Self::DEFAULT_MAX_DELAY }
	}

	/// Policy that never retries.
	pub const fn disabled() -> Self {
		Self::new(0)
	}

	/// Overrides the initial delay.
	pub fn with_base_delay(mut self, delay: Duration) -> Self {
		self.base_delay = delay;

		self
	}

	/// Overrides the delay cap.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.max_delay = delay;

		self
	}

	/// Returns `true` when requests should carry an attempt counter.
	pub const fn is_enabled(&self) -> bool {
		self.budget > 0
	}

	/// Returns `true` if a request that already retried `attempts` times should go again.
	///
	/// Cancellations are never retried; only network failures and 5xx responses are.
	pub fn should_retry(&self, attempts: u32, failure: FailureClass) -> bool {
		self.is_enabled() && attempts < self.budget && failure.is_transient()
	}

	/// Computes the wait before retry number `attempt_index` (0-based): `base * 2^index`, capped.
	pub fn delay_for(&self, attempt_index: u32) -> Duration {
		let factor = 2_u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
		let delay = self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX);

		delay.min(self.max_delay)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::disabled()
	}
}
