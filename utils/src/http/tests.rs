use http_body_util::BodyExt;

use super::*;

#[derive(Debug, thiserror::Error)]
#[error("database password is hunter2")]
struct SecretError;

async fn body_json(res: hyper::Response<Body>) -> serde_json::Value {
	let body = res.into_body().collect().await.expect("failed to read body").to_bytes();
	serde_json::from_slice(&body).expect("body is not json")
}

#[tokio::test]
async fn test_route_error_body() {
	let err: RouteError<SecretError> = (StatusCode::BAD_REQUEST, "Invalid log data").into();

	assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	assert_eq!(err.should_log(), ShouldLog::No);

	let res = err.response();
	assert_eq!(
		res.headers().get(hyper::header::CONTENT_TYPE).expect("missing content type"),
		"application/json"
	);
	assert_eq!(body_json(res).await, json!({ "error": "Invalid log data" }));
}

#[tokio::test]
async fn test_route_error_hides_source() {
	let err: RouteError<SecretError> = (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred", SecretError).into();

	assert_eq!(err.should_log(), ShouldLog::Yes);
	assert!(err.source_error().is_some());

	let req = hyper::Request::builder()
		.method("POST")
		.uri("/log")
		.body(())
		.expect("failed to build request");

	let res = error_handler(req, err).await;
	assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let body = body_json(res).await;
	assert_eq!(body, json!({ "error": "An internal error occurred" }));
	assert!(!body.to_string().contains("hunter2"));
}

#[test]
fn test_client_errors_with_source_log_at_debug() {
	let err: RouteError<SecretError> = (StatusCode::FORBIDDEN, "License expired", SecretError).into();
	assert_eq!(err.should_log(), ShouldLog::Debug);
}

#[test]
fn test_option_ext() {
	use ext::OptionExt;

	let value: Option<u8> = None;
	let err: RouteError<SecretError> = value
		.map_err_route((StatusCode::BAD_REQUEST, "missing"))
		.expect_err("none should map to an error");
	assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_result_ext_keeps_source() {
	use ext::ResultExt;

	let result: Result<(), SecretError> = Err(SecretError);
	let err: RouteError<SecretError> = result
		.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred"))
		.expect_err("error should be mapped");
	assert!(err.source_error().is_some());
	assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
