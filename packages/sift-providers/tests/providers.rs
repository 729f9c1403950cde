use std::{
	future::IntoFuture,
	sync::{Arc, Mutex},
};

use axum::{
	Json, Router,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
	routing,
};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
};

use sift_domain::Cursor;

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn start_query_server(seen: Seen) -> (String, Sender<()>) {
	let app = Router::new().route("/query", routing::post(query_handler)).with_state(seen);
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind query server.");
	let addr = listener.local_addr().expect("Failed to read query server address.");
	let (tx, rx) = oneshot::channel();
	let server = axum::serve(listener, app).with_graceful_shutdown(async move {
		let _ = rx.await;
	});

	tokio::spawn(async move {
		let _ = server.into_future().await;
	});

	(format!("http://{addr}"), tx)
}

async fn query_handler(
	State(seen): State<Seen>,
	headers: HeaderMap,
	Json(payload): Json<Value>,
) -> impl IntoResponse {
	let auth = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.map(|value| value.to_string());
	let cursor = payload.get("cursor").and_then(Value::as_str).map(str::to_string);

	seen.lock().unwrap_or_else(|err| err.into_inner()).push((auth, payload));

	match cursor.as_deref() {
		None => (
			StatusCode::OK,
			Json(serde_json::json!({
				"total_length": 2,
				"changes": [
					{ "rank": 1, "path": "/pics/cat.png", "score": 0.9 },
					{ "rank": 2, "path": "/pics/dog.png", "score": 0.8 }
				],
				"next_cursor": "c1"
			})),
		)
			.into_response(),
		Some("c1") => (
			StatusCode::OK,
			Json(serde_json::json!({
				"total_length": 2,
				"changes": [],
				"next_cursor": null
			})),
		)
			.into_response(),
		Some(_) => StatusCode::NOT_FOUND.into_response(),
	}
}

fn backend(api_base: String, api_key: Option<&str>) -> sift_config::Backend {
	sift_config::Backend {
		api_base,
		path: "/query".to_string(),
		api_key: api_key.map(str::to_string),
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers = sift_providers::auth_headers(Some("secret"), &Map::new())
		.expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn omits_auth_header_without_key() {
	let mut defaults = Map::new();

	defaults.insert("x-client".to_string(), Value::String("sift".to_string()));

	let headers = sift_providers::auth_headers(None, &defaults).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
	assert_eq!(headers.get("x-client").expect("Missing default header."), "sift");
}

#[tokio::test]
async fn walks_cursor_stream_over_http() {
	let seen: Seen = Arc::new(Mutex::new(Vec::new()));
	let (api_base, shutdown) = start_query_server(seen.clone()).await;
	let cfg = backend(api_base, Some("secret"));
	let first =
		sift_providers::query::query(&cfg, "pets", None).await.expect("First query failed.");

	assert_eq!(first.total_length, 2);
	assert_eq!(first.changes[0].name, "cat.png");
	assert_eq!(first.next_cursor, Some(Cursor::new("c1")));

	let second = sift_providers::query::query(&cfg, "pets", first.next_cursor.as_ref())
		.await
		.expect("Second query failed.");

	assert!(second.is_terminal());

	let seen = seen.lock().unwrap_or_else(|err| err.into_inner()).clone();

	assert_eq!(seen.len(), 2);
	assert_eq!(seen[0].0.as_deref(), Some("Bearer secret"));
	assert_eq!(seen[0].1, serde_json::json!({ "query_text": "pets", "cursor": null }));
	assert_eq!(seen[1].1, serde_json::json!({ "query_text": "pets", "cursor": "c1" }));

	let _ = shutdown.send(());
}

#[tokio::test]
async fn surfaces_http_errors() {
	let seen: Seen = Arc::new(Mutex::new(Vec::new()));
	let (api_base, shutdown) = start_query_server(seen).await;
	let cfg = backend(api_base, None);
	let err = sift_providers::query::query(&cfg, "pets", Some(&Cursor::new("expired")))
		.await
		.expect_err("Expected HTTP error.");

	assert!(matches!(err, sift_providers::Error::Reqwest(_)), "Unexpected error: {err}");

	let _ = shutdown.send(());
}
