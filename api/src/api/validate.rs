use binary_helper::global::{GlobalDb, RequestGlobalExt};
use bytes::Bytes;
use hyper::StatusCode;
use serde_json::json;
use utils::http::ext::ResultExt;
use utils::http::Body;
use utils::make_response;

use super::body::{parse_json, str_field};
use super::error::{BoxError, Result};
use super::INTERNAL_ERROR;
use crate::global::ApiGlobal;
use crate::license;

const MISSING_FIELDS: &str = "Invalid request. 'client_id' and 'license_key' are required.";

pub async fn handle<G: ApiGlobal, B>(req: hyper::Request<B>) -> Result<hyper::Response<Body>>
where
	B: hyper::body::Body<Data = Bytes> + Send + 'static,
	B::Error: Into<BoxError>,
{
	let global = req.get_global::<G>()?;

	let data = parse_json(req).await?;
	tracing::debug!(%data, "license validation request");

	let (Some(client_id), Some(license_key)) = (str_field(&data, "client_id"), str_field(&data, "license_key")) else {
		return Err((StatusCode::BAD_REQUEST, MISSING_FIELDS).into());
	};

	let check = license::validate(global.db().as_ref(), client_id, license_key)
		.await
		.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR))?;

	if let Some(reason) = check.rejection() {
		tracing::warn!(client_id, reason, "license validation failed");
		return Err((StatusCode::FORBIDDEN, reason).into());
	}

	tracing::info!(client_id, "license validated");

	Ok(make_response!(
		StatusCode::OK,
		json!({ "message": "License validation successful" })
	))
}
