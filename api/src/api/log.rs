use binary_helper::global::{GlobalConfig, GlobalDb, RequestGlobalExt};
use bytes::Bytes;
use hyper::StatusCode;
use serde_json::{json, Value};
use utils::http::Body;
use utils::make_response;

use super::body::parse_json;
use super::error::{BoxError, Result};
use super::INTERNAL_ERROR;
use crate::config::ApiConfig;
use crate::global::ApiGlobal;
use crate::log_entry::{self, LogError};

const INVALID_LOG_DATA: &str = "Invalid log data";

pub async fn handle<G: ApiGlobal, B>(req: hyper::Request<B>) -> Result<hyper::Response<Body>>
where
	B: hyper::body::Body<Data = Bytes> + Send + 'static,
	B::Error: Into<BoxError>,
{
	let global = req.get_global::<G>()?;

	let data = parse_json(req).await?;
	tracing::info!(%data, "log data received");

	let Value::Object(entry) = data else {
		return Err((StatusCode::BAD_REQUEST, INVALID_LOG_DATA).into());
	};

	let entry = match log_entry::save(global.db().as_ref(), entry).await {
		Ok(entry) => entry,
		Err(err @ LogError::Validation(_)) => return Err((StatusCode::BAD_REQUEST, INVALID_LOG_DATA, err).into()),
		Err(err) => return Err((StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, err).into()),
	};

	if let Some(dir) = &global.config::<ApiConfig>().log_archive_dir {
		if let Err(err) = log_entry::archive(dir, &entry).await {
			tracing::error!(error = %err, dir = %dir.display(), "failed to archive log");
		}
	}

	Ok(make_response!(
		StatusCode::OK,
		json!({ "message": "Log processed and saved successfully" })
	))
}
