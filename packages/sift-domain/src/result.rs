use std::fmt;

use serde::{Deserialize, Serialize};

/// One settled entry of a session's ranked list. `rank` is always `index + 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResult {
	pub rank: u32,
	pub name: String,
	pub path: String,
	pub score: f32,
}
impl ResolvedResult {
	pub(crate) fn from_change(change: &ChangeRecord) -> Self {
		Self {
			rank: change.rank,
			name: change.name.clone(),
			path: change.path.clone(),
			score: change.score,
		}
	}
}

/// A single entry of a batch. Without `old_rank` the entry is new to the session; with it, the
/// entry moves from `old_rank` to `rank` and takes the record's name and score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
	pub rank: u32,
	#[serde(default)]
	pub old_rank: Option<u32>,
	pub name: String,
	pub path: String,
	pub score: f32,
}
impl ChangeRecord {
	pub fn inserted(
		rank: u32,
		name: impl Into<String>,
		path: impl Into<String>,
		score: f32,
	) -> Self {
		Self { rank, old_rank: None, name: name.into(), path: path.into(), score }
	}

	pub fn moved(
		old_rank: u32,
		rank: u32,
		name: impl Into<String>,
		path: impl Into<String>,
		score: f32,
	) -> Self {
		Self { rank, old_rank: Some(old_rank), name: name.into(), path: path.into(), score }
	}

	pub fn is_insertion(&self) -> bool {
		self.old_rank.is_none()
	}
}

/// Opaque continuation token handed out by the ranking backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);
impl Cursor {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl fmt::Display for Cursor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
	pub total_length: u32,
	pub changes: Vec<ChangeRecord>,
	/// `None` marks the end of the result stream.
	pub next_cursor: Option<Cursor>,
}
impl BatchResponse {
	pub fn is_terminal(&self) -> bool {
		self.next_cursor.is_none()
	}
}
