use sift_domain::Cursor;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("No script for query {query:?}.")]
	UnknownQuery { query: String },
	#[error("Script for query {query:?} has no steps left.")]
	ScriptExhausted { query: String },
	#[error("Expected cursor {expected:?} but received {received:?}.")]
	UnexpectedCursor { expected: Option<Cursor>, received: Option<Cursor> },
	#[error("{0}")]
	Injected(String),
}
