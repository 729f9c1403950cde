use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub backend: Backend,
	pub pagination: Pagination,
	#[serde(default)]
	pub fetch: Fetch,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

/// Ranking backend serving the cursor query contract.
#[derive(Clone, Debug, Deserialize)]
pub struct Backend {
	pub api_base: String,
	pub path: String,
	/// Optional. Sent as a bearer token when present.
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pagination {
	pub page_size: u32,
	#[serde(default = "default_initial_page")]
	pub initial_page: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fetch {
	#[serde(default = "default_max_batches_per_fill")]
	pub max_batches_per_fill: u32,
	/// Extra attempts per batch after a transport failure. Zero disables retries.
	#[serde(default)]
	pub retry_attempts: u32,
	#[serde(default = "default_retry_base_backoff_ms")]
	pub retry_base_backoff_ms: u64,
	#[serde(default = "default_retry_max_backoff_ms")]
	pub retry_max_backoff_ms: u64,
}
impl Default for Fetch {
	fn default() -> Self {
		Self {
			max_batches_per_fill: default_max_batches_per_fill(),
			retry_attempts: 0,
			retry_base_backoff_ms: default_retry_base_backoff_ms(),
			retry_max_backoff_ms: default_retry_max_backoff_ms(),
		}
	}
}

fn default_initial_page() -> u32 {
	1
}

fn default_max_batches_per_fill() -> u32 {
	64
}

fn default_retry_base_backoff_ms() -> u64 {
	500
}

fn default_retry_max_backoff_ms() -> u64 {
	30_000
}
