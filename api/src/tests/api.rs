use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use utils::database::{RowMap, Store};
use utils::http::router::Router;
use utils::http::{Body, RouteError};

use super::global::{mock_global_state, unreachable_database, MockGlobal};
use super::log_entry::full_payload;
use super::store::{Failure, MockStore};
use crate::api::error::ApiError;
use crate::api::{middleware, routes};
use crate::config::ApiConfig;

async fn send(global: &Arc<MockGlobal>, method: Method, path: &str, body: &str, json: bool) -> (StatusCode, Value) {
	let mut req = Request::builder().method(method).uri(path);
	if json {
		req = req.header(hyper::header::CONTENT_TYPE, "application/json");
	}

	let req = req
		.body(Full::new(Bytes::from(body.to_owned())))
		.expect("failed to build request");

	let res = routes::<MockGlobal, Full<Bytes>>(global)
		.handle(req)
		.await
		.expect("router failed");

	read_response(res).await
}

async fn post(global: &Arc<MockGlobal>, path: &str, body: Value) -> (StatusCode, Value) {
	send(global, Method::POST, path, &body.to_string(), true).await
}

async fn read_response(res: Response<Body>) -> (StatusCode, Value) {
	let status = res.status();
	assert_eq!(
		res.headers().get(hyper::header::CONTENT_TYPE).expect("missing content type"),
		"application/json"
	);

	let body = res.into_body().collect().await.expect("failed to read body").to_bytes();
	(status, serde_json::from_slice(&body).expect("response is not json"))
}

fn global_with(store: MockStore) -> Arc<MockGlobal> {
	mock_global_state(ApiConfig::default(), Arc::new(store)).0
}

fn active_license() -> RowMap {
	RowMap::new()
		.with("license_key", "key-123")
		.with("status", "Active")
		.with("expires_at", "2999-01-01 00:00:00")
}

#[tokio::test]
async fn test_validate_success() {
	let global = global_with(MockStore::with_rows(vec![active_license()]));

	let (status, body) = post(&global, "/validate", json!({ "client_id": "c1", "license_key": "key-123" })).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "message": "License validation successful" }));
}

#[tokio::test]
async fn test_validate_missing_fields() {
	let global = global_with(MockStore::with_rows(vec![active_license()]));
	let expected = json!({ "error": "Invalid request. 'client_id' and 'license_key' are required." });

	for body in [
		json!({ "client_id": "c1" }),
		json!({ "license_key": "key-123" }),
		json!({ "client_id": 42, "license_key": "key-123" }),
		json!(["c1", "key-123"]),
	] {
		let (status, response) = post(&global, "/validate", body).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(response, expected);
	}
}

#[tokio::test]
async fn test_validate_rejections() {
	let global = global_with(MockStore::default());
	let (status, body) = post(&global, "/validate", json!({ "client_id": "nobody", "license_key": "x" })).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body, json!({ "error": "License not found" }));

	let global = global_with(MockStore::with_rows(vec![active_license().with("status", "REVOKED")]));
	let (status, body) = post(&global, "/validate", json!({ "client_id": "c1", "license_key": "key-123" })).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body, json!({ "error": "License revoked" }));

	let global = global_with(MockStore::failing(Failure::Query));
	let (status, body) = post(&global, "/validate", json!({ "client_id": "c1", "license_key": "key-123" })).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body, json!({ "error": "Validation error" }));
}

#[tokio::test]
async fn test_promotions() {
	let global = global_with(MockStore::with_rows(vec![
		RowMap::new()
			.with("message", "spring sale")
			.with("start_time", "2000-01-01T00:00:00")
			.with("end_time", "2999-01-01T00:00:00"),
		RowMap::new()
			.with("message", "long gone")
			.with("start_time", "2000-01-01T00:00:00")
			.with("end_time", "2000-01-02T00:00:00"),
	]));

	let (status, body) = post(&global, "/promotions", json!({ "client_id": "c1" })).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "promotions": ["spring sale"] }));

	let (status, body) = post(&global, "/promotions", json!({ "client": "c1" })).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Invalid request. 'client_id' is required." }));

	let (status, _) = post(&global, "/promotions", json!(["client_id"])).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_promotions_client_id_only_needs_to_be_present() {
	let global = global_with(MockStore::with_rows(vec![RowMap::new()
		.with("message", "spring sale")
		.with("start_time", "2000-01-01 00:00:00")
		.with("end_time", "2999-01-01 00:00:00")]));

	for client_id in [json!(42), json!(null), json!({ "id": "c1" })] {
		let (status, body) = post(&global, "/promotions", json!({ "client_id": client_id })).await;
		assert_eq!(status, StatusCode::OK, "client_id = {client_id}");
		assert_eq!(body, json!({ "promotions": ["spring sale"] }));
	}
}

#[tokio::test]
async fn test_promotions_query_failure_is_empty() {
	let global = global_with(MockStore::failing(Failure::Query));

	let (status, body) = post(&global, "/promotions", json!({ "client_id": "c1" })).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "promotions": [] }));
}

#[tokio::test]
async fn test_malformed_json() {
	let global = global_with(MockStore::default());
	let expected = json!({ "error": "Invalid JSON format in request body." });

	for path in ["/validate", "/promotions", "/log"] {
		for body in ["{\"client_id\": ", "", "null"] {
			let (status, response) = send(&global, Method::POST, path, body, true).await;
			assert_eq!(status, StatusCode::BAD_REQUEST, "{path} {body:?}");
			assert_eq!(response, expected);
		}
	}
}

#[tokio::test]
async fn test_content_type_not_required() {
	let global = global_with(MockStore::with_rows(vec![active_license()]));

	let body = json!({ "client_id": "c1", "license_key": "key-123" }).to_string();
	let (status, _) = send(&global, Method::POST, "/validate", &body, false).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_log_success() {
	let store = Arc::new(MockStore::default());
	let (global, _handler) = mock_global_state(ApiConfig::default(), store.clone());

	let (status, body) = post(&global, "/log", full_payload()).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "message": "Log processed and saved successfully" }));
	assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_log_invalid_data() {
	let store = Arc::new(MockStore::default());
	let (global, _handler) = mock_global_state(ApiConfig::default(), store.clone());
	let expected = json!({ "error": "Invalid log data" });

	let mut payload = full_payload();
	payload.as_object_mut().expect("payload is an object").remove("error_logs");

	for body in [payload, json!([1, 2, 3]), json!("log")] {
		let (status, response) = post(&global, "/log", body).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(response, expected);
	}

	assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_log_insert_failure() {
	let global = global_with(MockStore::failing(Failure::Query));

	let (status, body) = post(&global, "/log", full_payload()).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body, json!({ "error": "An internal error occurred" }));
}

#[tokio::test]
async fn test_log_archive() {
	let dir = tempfile::tempdir().expect("failed to create temp dir");
	let config = ApiConfig {
		log_archive_dir: Some(dir.path().to_owned()),
		..Default::default()
	};
	let (global, _handler) = mock_global_state(config, Arc::new(MockStore::default()));

	let (status, _) = post(&global, "/log", full_payload()).await;
	assert_eq!(status, StatusCode::OK);
	assert!(dir.path().join("1.2.3.4_2024-01-02T03-04-05-000Z.json").exists());

	// A failed insert is not archived.
	let config = ApiConfig {
		log_archive_dir: Some(dir.path().join("failed")),
		..Default::default()
	};
	let (global, _handler) = mock_global_state(config, Arc::new(MockStore::failing(Failure::Query)));

	let (status, _) = post(&global, "/log", full_payload()).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(!dir.path().join("failed").exists());
}

#[tokio::test]
async fn test_log_archive_failure_is_ignored() {
	let dir = tempfile::tempdir().expect("failed to create temp dir");
	let config = ApiConfig {
		log_archive_dir: Some(dir.path().join("does-not-exist")),
		..Default::default()
	};
	let (global, _handler) = mock_global_state(config, Arc::new(MockStore::default()));

	let (status, _) = post(&global, "/log", full_payload()).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_not_found() {
	let global = global_with(MockStore::default());

	let (status, body) = post(&global, "/licenses", json!({})).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Not found" }));

	let (status, _) = send(&global, Method::GET, "/validate", "", false).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connection_failure_is_internal_error() {
	let config = unreachable_database();
	let port = config.port.to_string();

	let pool = binary_helper::global::setup_database(&config).await.expect("failed to build pool");
	let (global, _handler) = mock_global_state(ApiConfig::default(), Arc::new(pool) as Arc<dyn Store>);

	for (path, body) in [
		("/validate", json!({ "client_id": "c1", "license_key": "key-123" })),
		("/promotions", json!({ "client_id": "c1" })),
		("/log", full_payload()),
	] {
		let (status, response) = post(&global, path, body).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
		assert_eq!(response, json!({ "error": "An internal error occurred" }));
		assert!(!response.to_string().contains(&port));
	}
}

#[tokio::test]
async fn test_panics_become_internal_errors() {
	let router = Router::<Full<Bytes>, Body, RouteError<ApiError>>::builder()
		.middleware(middleware::catch_panic())
		.post("/boom", |_| async move {
			if true {
				panic!("handler exploded");
			}

			Ok(Response::new(Body::default()))
		})
		.error_handler(utils::http::error_handler::<ApiError>)
		.build();

	let req = Request::builder()
		.method(Method::POST)
		.uri("/boom")
		.body(Full::default())
		.expect("failed to build request");

	let res = router.handle(req).await.expect("router failed");
	let (status, body) = read_response(res).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body, json!({ "error": "An internal error occurred" }));
}

#[tokio::test]
async fn test_run_serves_until_cancelled() {
	let port = portpicker::pick_unused_port().expect("no free port");
	let config = ApiConfig {
		bind_address: SocketAddr::from(([127, 0, 0, 1], port)),
		..Default::default()
	};

	let (global, handler) = mock_global_state(config, Arc::new(MockStore::default()));
	let server = tokio::spawn(crate::api::run(global.clone()));
	drop(global);

	let mut stream = None;
	for _ in 0..50 {
		match TcpStream::connect(("127.0.0.1", port)).await {
			Ok(s) => {
				stream = Some(s);
				break;
			}
			Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
		}
	}
	let mut stream = stream.expect("server did not start");

	stream
		.write_all(b"POST /promotions HTTP/1.1\r\nhost: localhost\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}")
		.await
		.expect("failed to write request");

	let mut response = String::new();
	stream.read_to_string(&mut response).await.expect("failed to read response");
	assert!(response.starts_with("HTTP/1.1 400"), "{response}");
	assert!(response.contains("'client_id' is required"));

	tokio::time::timeout(Duration::from_secs(5), handler.cancel())
		.await
		.expect("shutdown timed out");

	server.await.expect("server panicked").expect("server failed");
}
