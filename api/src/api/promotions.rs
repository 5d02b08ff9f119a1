use binary_helper::global::{GlobalDb, RequestGlobalExt};
use bytes::Bytes;
use hyper::StatusCode;
use serde_json::json;
use utils::http::ext::{OptionExt, ResultExt};
use utils::http::Body;
use utils::make_response;

use super::body::{field, parse_json};
use super::error::{BoxError, Result};
use super::INTERNAL_ERROR;
use crate::global::ApiGlobal;
use crate::promotion;

const MISSING_CLIENT_ID: &str = "Invalid request. 'client_id' is required.";

pub async fn handle<G: ApiGlobal, B>(req: hyper::Request<B>) -> Result<hyper::Response<Body>>
where
	B: hyper::body::Body<Data = Bytes> + Send + 'static,
	B::Error: Into<BoxError>,
{
	let global = req.get_global::<G>()?;

	let data = parse_json(req).await?;
	tracing::debug!(%data, "promotions request");

	let client_id = field(&data, "client_id").map_err_route((StatusCode::BAD_REQUEST, MISSING_CLIENT_ID))?;

	let promotions = promotion::fetch_active(global.db().as_ref())
		.await
		.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR))?;

	tracing::info!(%client_id, count = promotions.len(), "promotions fetched");

	Ok(make_response!(StatusCode::OK, json!({ "promotions": promotions })))
}
