use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use serde::Serialize;
use tokio::sync::Notify;

use crate::{Error, Result, Session, session::SessionInner};
use sift_domain::{BatchResponse, Cursor, merge};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
	pub max_batches_per_fill: u32,
	pub retry_attempts: u32,
	pub retry_base_backoff_ms: u64,
	pub retry_max_backoff_ms: u64,
}
impl FetchPolicy {
	pub fn from_config(cfg: &sift_config::Fetch) -> Self {
		Self {
			max_batches_per_fill: cfg.max_batches_per_fill,
			retry_attempts: cfg.retry_attempts,
			retry_base_backoff_ms: cfg.retry_base_backoff_ms,
			retry_max_backoff_ms: cfg.retry_max_backoff_ms,
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.max_batches_per_fill == 0 {
			return Err(Error::InvalidRequest {
				message: "max_batches_per_fill must be greater than zero.".to_string(),
			});
		}
		if self.retry_base_backoff_ms > self.retry_max_backoff_ms {
			return Err(Error::InvalidRequest {
				message: "retry_base_backoff_ms must not exceed retry_max_backoff_ms.".to_string(),
			});
		}

		Ok(())
	}

	pub fn backoff(&self, attempt: u32) -> Duration {
		let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
		let ms = self.retry_base_backoff_ms.saturating_mul(factor).min(self.retry_max_backoff_ms);

		Duration::from_millis(ms)
	}
}
impl Default for FetchPolicy {
	fn default() -> Self {
		Self::from_config(&sift_config::Fetch::default())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOutcome {
	/// The list already covers the target.
	Satisfied,
	/// The stream ended before or while reaching the target.
	Exhausted,
	/// Another fill is in flight for this session; nothing was requested.
	AlreadyFilling,
	/// Stopped after the per-call batch limit; more data remains.
	BatchLimit,
	/// The session was retired; any late batch was dropped.
	Superseded,
}

/// Single-flight marker for one session. Dropping it wakes every [`Session::fill_settled`] waiter.
struct FillGuard<'a> {
	flag: &'a AtomicBool,
	settled: &'a Notify,
}
impl<'a> FillGuard<'a> {
	fn acquire(flag: &'a AtomicBool, settled: &'a Notify) -> Option<Self> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self { flag, settled })
	}
}
impl Drop for FillGuard<'_> {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::Release);
		self.settled.notify_waiters();
	}
}

impl Session {
	/// Waits until no fill is in flight for this session. Returns at once when idle.
	pub async fn fill_settled(&self) {
		let notified = self.settled.notified();

		tokio::pin!(notified);

		// Register before checking the flag so a guard dropped in between still wakes us.
		notified.as_mut().enable();

		if self.is_loading() {
			notified.await;
		}
	}

	/// Fetches batches one at a time until the list holds `target` results or the stream ends.
	///
	/// On error the list, cursor and page state are exactly as they were before the failing
	/// batch was requested.
	pub async fn fill(&self, target: usize) -> Result<FillOutcome> {
		if self.is_retired() {
			return Ok(FillOutcome::Superseded);
		}
		if let Some(outcome) = settled(&self.lock(), target) {
			return Ok(outcome);
		}

		let Some(_guard) = FillGuard::acquire(&self.filling, &self.settled) else {
			tracing::debug!(session_id = %self.id, target, "Fill already in flight.");

			return Ok(FillOutcome::AlreadyFilling);
		};
		let mut batches = 0;

		loop {
			let (current, cursor) = {
				let inner = self.lock();

				if let Some(outcome) = settled(&inner, target) {
					return Ok(outcome);
				}

				(Arc::clone(&inner.results), inner.cursor.clone())
			};

			if batches == self.policy.max_batches_per_fill {
				tracing::warn!(
					session_id = %self.id,
					batches,
					total_length = current.len(),
					target,
					"Fill stopped at the batch limit."
				);

				return Ok(FillOutcome::BatchLimit);
			}

			let batch = self.fetch_batch(cursor.as_ref()).await?;

			batches += 1;

			if self.is_retired() {
				tracing::debug!(
					session_id = %self.id,
					changes = batch.changes.len(),
					"Dropping batch for a retired session."
				);

				return Ok(FillOutcome::Superseded);
			}

			let merged = merge(&current, batch.total_length, &batch.changes).map_err(|err| {
				tracing::warn!(
					session_id = %self.id,
					cursor = ?cursor,
					error = %err,
					"Rejected malformed batch."
				);

				Error::from(err)
			})?;
			let mut inner = self.lock();

			inner.results = Arc::new(merged);

			tracing::debug!(
				session_id = %self.id,
				total_length = batch.total_length,
				changes = batch.changes.len(),
				"Applied batch."
			);

			match batch.next_cursor {
				Some(next) => inner.cursor = Some(next),
				None => {
					inner.exhausted = true;

					let max_pages = inner.pagination.mark_exhausted(batch.total_length);

					tracing::info!(
						session_id = %self.id,
						total_length = batch.total_length,
						max_pages,
						"Result stream exhausted."
					);
				},
			}
		}
	}

	async fn fetch_batch(&self, cursor: Option<&Cursor>) -> Result<BatchResponse> {
		let mut attempt = 0;

		loop {
			match self.backend.query(&self.query, cursor).await {
				Ok(batch) => return Ok(batch),
				Err(err) if attempt < self.policy.retry_attempts && !self.is_retired() => {
					let backoff = self.policy.backoff(attempt);

					tracing::warn!(
						session_id = %self.id,
						attempt,
						backoff_ms = backoff.as_millis() as u64,
						error = %err,
						"Batch request failed; retrying."
					);
					tokio::time::sleep(backoff).await;

					attempt += 1;
				},
				Err(err) => {
					tracing::warn!(
						session_id = %self.id,
						cursor = ?cursor,
						error = %err,
						"Batch request failed."
					);

					return Err(err.into());
				},
			}
		}
	}
}

fn settled(inner: &SessionInner, target: usize) -> Option<FillOutcome> {
	if inner.results.len() >= target {
		Some(FillOutcome::Satisfied)
	} else if inner.exhausted {
		Some(FillOutcome::Exhausted)
	} else {
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_up_to_cap() {
		let policy = FetchPolicy {
			max_batches_per_fill: 8,
			retry_attempts: 5,
			retry_base_backoff_ms: 500,
			retry_max_backoff_ms: 3_000,
		};

		assert_eq!(policy.backoff(0), Duration::from_millis(500));
		assert_eq!(policy.backoff(1), Duration::from_millis(1_000));
		assert_eq!(policy.backoff(2), Duration::from_millis(2_000));
		assert_eq!(policy.backoff(3), Duration::from_millis(3_000));
		assert_eq!(policy.backoff(80), Duration::from_millis(3_000));
	}

	#[test]
	fn guard_is_single_flight_and_released_on_drop() {
		let flag = AtomicBool::new(false);
		let settled = Notify::new();
		let guard = FillGuard::acquire(&flag, &settled).expect("First acquire must succeed.");

		assert!(FillGuard::acquire(&flag, &settled).is_none());

		drop(guard);

		assert!(FillGuard::acquire(&flag, &settled).is_some());
	}

	#[tokio::test]
	async fn dropping_the_guard_wakes_waiters() {
		let flag = AtomicBool::new(false);
		let settled = Notify::new();
		let guard = FillGuard::acquire(&flag, &settled).expect("First acquire must succeed.");
		let waiter = settled.notified();

		tokio::pin!(waiter);
		waiter.as_mut().enable();
		drop(guard);

		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.expect("Waiter was not woken.");
	}
}
