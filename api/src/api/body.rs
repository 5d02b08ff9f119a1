use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use serde_json::Value;
use utils::http::ext::ResultExt;

use super::error::{ApiError, BoxError, Result};

pub const INVALID_JSON: &str = "Invalid JSON format in request body.";

/// Reads the whole body as JSON. The declared content type is not enforced.
pub async fn parse_json<B>(req: hyper::Request<B>) -> Result<Value>
where
	B: hyper::body::Body<Data = Bytes> + Send + 'static,
	B::Error: Into<BoxError>,
{
	let content_type = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
	if !content_type.is_some_and(|v| v.starts_with("application/json")) {
		tracing::warn!(content_type, "content type is not application/json, assuming json payload");
	}

	let body = req
		.into_body()
		.collect()
		.await
		.map_err(|err| ApiError::ReadHttpBody(err.into()))
		.map_err_route((StatusCode::BAD_REQUEST, INVALID_JSON))?
		.to_bytes();

	let value: Value = serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, INVALID_JSON))?;

	if value.is_null() {
		return Err((StatusCode::BAD_REQUEST, INVALID_JSON, ApiError::NullBody).into());
	}

	Ok(value)
}

/// A field of a JSON object, whatever its value, `null` included.
pub fn field<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
	value.as_object().and_then(|object| object.get(field))
}

/// A string field of a JSON object. Non-string values count as missing.
pub fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
	value.get(field).and_then(Value::as_str)
}
