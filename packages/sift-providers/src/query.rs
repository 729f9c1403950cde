use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};
use sift_domain::{BatchResponse, ChangeRecord, Cursor};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
	query_text: &'a str,
	cursor: Option<&'a str>,
}

// Field aliases accept the ranking backend's native response names.
#[derive(Debug, Deserialize)]
struct WireBatch {
	#[serde(alias = "results_len")]
	total_length: u32,
	#[serde(default, alias = "changed_results")]
	changes: Vec<WireChange>,
	#[serde(default, alias = "cursor_id")]
	next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChange {
	rank: u32,
	#[serde(default)]
	old_rank: Option<u32>,
	#[serde(default)]
	name: Option<String>,
	path: String,
	#[serde(alias = "similarity")]
	score: f32,
}

/// Requests the next batch for `query_text`. A `None` cursor starts the stream.
pub async fn query(
	cfg: &sift_config::Backend,
	query_text: &str,
	cursor: Option<&Cursor>,
) -> Result<BatchResponse> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = QueryRequest { query_text, cursor: cursor.map(Cursor::as_str) };

	tracing::debug!(url = %url, cursor = ?body.cursor, "Requesting result batch.");

	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_batch_response(json)
}

pub fn parse_batch_response(json: Value) -> Result<BatchResponse> {
	let wire: WireBatch = serde_json::from_value(json)?;
	let mut changes = Vec::with_capacity(wire.changes.len());

	for change in wire.changes {
		if change.path.trim().is_empty() {
			return Err(Error::InvalidResponse {
				message: format!("Change at rank {} is missing a path.", change.rank),
			});
		}

		let name = match change.name {
			Some(name) if !name.trim().is_empty() => name,
			_ => file_name(&change.path).to_string(),
		};

		changes.push(ChangeRecord {
			rank: change.rank,
			old_rank: change.old_rank,
			name,
			path: change.path,
			score: change.score,
		});
	}

	Ok(BatchResponse {
		total_length: wire.total_length,
		changes,
		next_cursor: wire.next_cursor.filter(|cursor| !cursor.is_empty()).map(Cursor::new),
	})
}

fn file_name(path: &str) -> &str {
	path.rsplit(|c: char| c == '/' || c == '\\').find(|segment| !segment.is_empty()).unwrap_or(path)
}
