use std::{
	num::NonZeroU32,
	sync::{Arc, Mutex, MutexGuard},
};

use crate::{Error, FetchPolicy, QueryBackend, Result, Session};
use sift_config::Config;

/// Holds the one live session a view is driving.
///
/// Changing the query retires the previous session instead of resetting it, so a batch that
/// lands late for an old query can only ever touch that old session.
pub struct SessionSlot {
	backend: Arc<dyn QueryBackend>,
	page_size: NonZeroU32,
	initial_page: u32,
	policy: FetchPolicy,
	live: Mutex<Option<Arc<Session>>>,
}
impl SessionSlot {
	pub fn new(
		backend: Arc<dyn QueryBackend>,
		page_size: u32,
		initial_page: u32,
		policy: FetchPolicy,
	) -> Result<Self> {
		let page_size = NonZeroU32::new(page_size).ok_or_else(|| Error::InvalidRequest {
			message: "page_size must be greater than zero.".to_string(),
		})?;

		policy.validate()?;

		Ok(Self { backend, page_size, initial_page, policy, live: Mutex::new(None) })
	}

	pub fn from_config(cfg: &Config, backend: Arc<dyn QueryBackend>) -> Result<Self> {
		Self::new(
			backend,
			cfg.pagination.page_size,
			cfg.pagination.initial_page,
			FetchPolicy::from_config(&cfg.fetch),
		)
	}

	/// Points the slot at `query`. Returns the live session, or `None` for a blank query.
	pub fn set_query(&self, query: &str) -> Result<Option<Arc<Session>>> {
		let query = query.trim();
		let mut live = self.lock();

		if query.is_empty() {
			if let Some(previous) = live.take() {
				previous.retire();
			}

			return Ok(None);
		}
		if let Some(current) = live.as_ref()
			&& current.query() == query
		{
			return Ok(Some(Arc::clone(current)));
		}

		let session = Arc::new(Session::new(
			query,
			self.page_size.get(),
			self.initial_page,
			Arc::clone(&self.backend),
			self.policy,
		)?);

		if let Some(previous) = live.replace(Arc::clone(&session)) {
			tracing::debug!(
				previous = %previous.id(),
				next = %session.id(),
				"Query changed; superseding session."
			);

			previous.retire();
		}

		Ok(Some(session))
	}

	pub fn live(&self) -> Option<Arc<Session>> {
		self.lock().clone()
	}

	pub fn detach(&self) {
		if let Some(previous) = self.lock().take() {
			previous.retire();
		}
	}

	fn lock(&self) -> MutexGuard<'_, Option<Arc<Session>>> {
		self.live.lock().unwrap_or_else(|err| err.into_inner())
	}
}
