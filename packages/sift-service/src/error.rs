use sift_domain::MergeError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Backend error: {message}")]
	Backend { message: String },
	#[error("Malformed batch: {0}")]
	MalformedBatch(#[from] MergeError),
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Backend { message: err.to_string() }
	}
}
