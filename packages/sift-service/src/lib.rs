pub mod fetch;
pub mod session;
pub mod slot;

mod error;

pub use error::{Error, Result};
pub use fetch::{FetchPolicy, FillOutcome};
pub use session::{Session, SessionSnapshot, SessionState};
pub use slot::SessionSlot;

use std::{future::Future, pin::Pin};

use sift_domain::{BatchResponse, Cursor};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The ranking backend's cursor query contract.
pub trait QueryBackend
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		query_text: &'a str,
		cursor: Option<&'a Cursor>,
	) -> BoxFuture<'a, color_eyre::Result<BatchResponse>>;
}

/// Talks to the configured backend over HTTP.
pub struct HttpBackend {
	cfg: sift_config::Backend,
}
impl HttpBackend {
	pub fn new(cfg: sift_config::Backend) -> Self {
		Self { cfg }
	}
}
impl QueryBackend for HttpBackend {
	fn query<'a>(
		&'a self,
		query_text: &'a str,
		cursor: Option<&'a Cursor>,
	) -> BoxFuture<'a, color_eyre::Result<BatchResponse>> {
		Box::pin(async move {
			Ok(sift_providers::query::query(&self.cfg, query_text, cursor).await?)
		})
	}
}
