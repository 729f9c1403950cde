use std::{
	num::NonZeroU32,
	sync::{
		Arc, Mutex, MutexGuard,
		atomic::{AtomicBool, Ordering},
	},
};

use serde::Serialize;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{Error, FetchPolicy, FillOutcome, QueryBackend, Result};
use sift_config::Config;
use sift_domain::{Cursor, Pagination, ResolvedResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	Idle,
	Filling,
	Exhausted,
}

/// Everything a view needs for one render, read under a single lock.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
	pub session_id: Uuid,
	pub query: String,
	pub state: SessionState,
	pub current_page: u32,
	pub max_pages: Option<u32>,
	pub total_length: u32,
	pub has_more: bool,
	pub is_loading: bool,
	pub results: Vec<ResolvedResult>,
}

/// Owns the ranked list, cursor and page state of one query string.
///
/// The list is only ever replaced whole, after a batch has been merged, so readers never see a
/// partially applied batch. A session is never reset; a new query gets a new session.
pub struct Session {
	pub(crate) id: Uuid,
	pub(crate) query: String,
	pub(crate) backend: Arc<dyn QueryBackend>,
	pub(crate) policy: FetchPolicy,
	pub(crate) inner: Mutex<SessionInner>,
	pub(crate) filling: AtomicBool,
	pub(crate) settled: Notify,
	pub(crate) retired: AtomicBool,
}

pub(crate) struct SessionInner {
	pub(crate) results: Arc<Vec<ResolvedResult>>,
	/// `None` until the first batch arrives.
	pub(crate) cursor: Option<Cursor>,
	pub(crate) exhausted: bool,
	pub(crate) pagination: Pagination,
}

impl Session {
	pub fn new(
		query: impl Into<String>,
		page_size: u32,
		initial_page: u32,
		backend: Arc<dyn QueryBackend>,
		policy: FetchPolicy,
	) -> Result<Self> {
		let page_size = NonZeroU32::new(page_size).ok_or_else(|| Error::InvalidRequest {
			message: "page_size must be greater than zero.".to_string(),
		})?;

		policy.validate()?;

		let session = Self {
			id: Uuid::new_v4(),
			query: query.into(),
			backend,
			policy,
			inner: Mutex::new(SessionInner {
				results: Arc::new(Vec::new()),
				cursor: None,
				exhausted: false,
				pagination: Pagination::new(page_size, initial_page),
			}),
			filling: AtomicBool::new(false),
			settled: Notify::new(),
			retired: AtomicBool::new(false),
		};

		tracing::debug!(session_id = %session.id, query = %session.query, "Session created.");

		Ok(session)
	}

	pub fn from_config(
		query: impl Into<String>,
		cfg: &Config,
		backend: Arc<dyn QueryBackend>,
	) -> Result<Self> {
		Self::new(
			query,
			cfg.pagination.page_size,
			cfg.pagination.initial_page,
			backend,
			FetchPolicy::from_config(&cfg.fetch),
		)
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	/// The current page's slice of the ranked list.
	pub fn results(&self) -> Vec<ResolvedResult> {
		let inner = self.lock();

		inner.results[inner.pagination.window(inner.results.len())].to_vec()
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		let inner = self.lock();

		SessionSnapshot {
			session_id: self.id,
			query: self.query.clone(),
			state: self.state_of(&inner),
			current_page: inner.pagination.current_page(),
			max_pages: inner.pagination.max_pages(),
			total_length: inner.results.len() as u32,
			has_more: !inner.exhausted,
			is_loading: self.is_loading(),
			results: inner.results[inner.pagination.window(inner.results.len())].to_vec(),
		}
	}

	pub fn state(&self) -> SessionState {
		self.state_of(&self.lock())
	}

	pub fn is_loading(&self) -> bool {
		self.filling.load(Ordering::Acquire)
	}

	pub fn has_more(&self) -> bool {
		!self.lock().exhausted
	}

	pub fn current_page(&self) -> u32 {
		self.lock().pagination.current_page()
	}

	/// Known only once the result stream is exhausted.
	pub fn max_pages(&self) -> Option<u32> {
		self.lock().pagination.max_pages()
	}

	pub fn total_length(&self) -> u32 {
		self.lock().results.len() as u32
	}

	pub fn set_page(&self, page: u32) -> u32 {
		self.lock().pagination.set_page(page)
	}

	pub fn next_page(&self) -> u32 {
		self.lock().pagination.next_page()
	}

	pub fn previous_page(&self) -> u32 {
		self.lock().pagination.previous_page()
	}

	/// Moves to `page` and fetches until the list covers it or the stream ends.
	///
	/// Safe to call repeatedly: a call that finds a fill already in flight returns
	/// [`FillOutcome::AlreadyFilling`] without issuing a request.
	pub async fn ensure_page(&self, page: u32) -> Result<FillOutcome> {
		self.set_page(page);

		self.ensure_current_page().await
	}

	pub async fn ensure_current_page(&self) -> Result<FillOutcome> {
		let target = self.lock().pagination.fill_target();

		self.fill(target).await
	}

	/// Marks this session as superseded. Batches that arrive afterwards are dropped.
	pub fn retire(&self) {
		if !self.retired.swap(true, Ordering::AcqRel) {
			tracing::debug!(session_id = %self.id, query = %self.query, "Session retired.");
		}
	}

	pub fn is_retired(&self) -> bool {
		self.retired.load(Ordering::Acquire)
	}

	pub(crate) fn lock(&self) -> MutexGuard<'_, SessionInner> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn state_of(&self, inner: &SessionInner) -> SessionState {
		if self.is_loading() {
			SessionState::Filling
		} else if inner.exhausted {
			SessionState::Exhausted
		} else {
			SessionState::Idle
		}
	}
}
