mod error;

pub use error::{Error, Result};

use std::{
	collections::{HashMap, VecDeque},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use tokio::sync::Semaphore;

use sift_domain::{BatchResponse, ChangeRecord, Cursor};
use sift_service::{BoxFuture, QueryBackend};

#[derive(Clone, Debug)]
pub enum Step {
	Batch(BatchResponse),
	Fail(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
	pub query_text: String,
	pub cursor: Option<Cursor>,
}

struct Script {
	steps: VecDeque<Step>,
	expected_cursor: Option<Cursor>,
}

/// In-memory backend that replays per-query scripts.
///
/// Each request must carry the cursor returned by the previous batch of the same query. With a
/// gate installed, every request waits for one permit before answering.
#[derive(Default)]
pub struct ScriptedBackend {
	scripts: Mutex<HashMap<String, Script>>,
	requests: Mutex<Vec<Request>>,
	gate: Option<Arc<Semaphore>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_script(self, query: &str, steps: impl IntoIterator<Item = Step>) -> Self {
		let script = Script { steps: steps.into_iter().collect(), expected_cursor: None };

		self.scripts
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(query.to_string(), script);

		self
	}

	pub fn with_batches(
		self,
		query: &str,
		batches: impl IntoIterator<Item = BatchResponse>,
	) -> Self {
		self.with_script(query, batches.into_iter().map(Step::Batch))
	}

	/// Holds every request until the returned semaphore grants it a permit.
	pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
		let gate = Arc::new(Semaphore::new(0));

		self.gate = Some(Arc::clone(&gate));

		(self, gate)
	}

	pub fn requests(&self) -> Vec<Request> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	/// Highest number of requests that were ever in flight at once.
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	pub fn remaining(&self, query: &str) -> usize {
		self.scripts
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.get(query)
			.map(|script| script.steps.len())
			.unwrap_or(0)
	}

	fn answer(&self, query_text: &str, cursor: Option<&Cursor>) -> Result<BatchResponse> {
		let mut scripts = self.scripts.lock().unwrap_or_else(|err| err.into_inner());
		let script = scripts
			.get_mut(query_text)
			.ok_or_else(|| Error::UnknownQuery { query: query_text.to_string() })?;

		if script.expected_cursor.as_ref() != cursor {
			return Err(Error::UnexpectedCursor {
				expected: script.expected_cursor.clone(),
				received: cursor.cloned(),
			});
		}

		match script.steps.pop_front() {
			Some(Step::Batch(batch)) => {
				script.expected_cursor = batch.next_cursor.clone();

				Ok(batch)
			},
			Some(Step::Fail(message)) => Err(Error::Injected(message)),
			None => Err(Error::ScriptExhausted { query: query_text.to_string() }),
		}
	}
}
impl QueryBackend for ScriptedBackend {
	fn query<'a>(
		&'a self,
		query_text: &'a str,
		cursor: Option<&'a Cursor>,
	) -> BoxFuture<'a, color_eyre::Result<BatchResponse>> {
		Box::pin(async move {
			self.requests
				.lock()
				.unwrap_or_else(|err| err.into_inner())
				.push(Request { query_text: query_text.to_string(), cursor: cursor.cloned() });

			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_in_flight.fetch_max(now, Ordering::SeqCst);

			if let Some(gate) = &self.gate
				&& let Ok(permit) = gate.acquire().await
			{
				permit.forget();
			}

			let answer = self.answer(query_text, cursor);

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			Ok(answer?)
		})
	}
}

/// Change records that turn the `old` ranking into the `new` one.
///
/// Entries are `(path, score)` in rank order. An entry is reported when it is new, or when its
/// rank or score changed; unchanged entries are left out.
pub fn changes_between<S>(old: &[(S, f32)], new: &[(S, f32)]) -> Vec<ChangeRecord>
where
	S: AsRef<str>,
{
	let old_ranks: HashMap<&str, (u32, f32)> = old
		.iter()
		.enumerate()
		.map(|(index, (path, score))| (path.as_ref(), (index as u32 + 1, *score)))
		.collect();

	new.iter()
		.enumerate()
		.filter_map(|(index, (path, score))| {
			let path = path.as_ref();
			let rank = index as u32 + 1;

			match old_ranks.get(path) {
				Some((old_rank, old_score)) if *old_rank == rank && old_score == score => None,
				Some((old_rank, _)) =>
					Some(ChangeRecord::moved(*old_rank, rank, file_name(path), path, *score)),
				None => Some(ChangeRecord::inserted(rank, file_name(path), path, *score)),
			}
		})
		.collect()
}

/// One batch per snapshot with cursors `c1`, `c2`, ...; the last batch is terminal.
pub fn batches_from_snapshots<S>(snapshots: &[Vec<(S, f32)>]) -> Vec<BatchResponse>
where
	S: AsRef<str>,
{
	let empty: Vec<(S, f32)> = Vec::new();
	let mut previous = &empty;
	let mut batches = Vec::with_capacity(snapshots.len());

	for (index, snapshot) in snapshots.iter().enumerate() {
		let next_cursor =
			(index + 1 < snapshots.len()).then(|| Cursor::new(format!("c{}", index + 1)));

		batches.push(BatchResponse {
			total_length: snapshot.len() as u32,
			changes: changes_between(previous, snapshot),
			next_cursor,
		});

		previous = snapshot;
	}

	batches
}

fn file_name(path: &str) -> &str {
	path.rsplit('/').find(|segment| !segment.is_empty()).unwrap_or(path)
}
