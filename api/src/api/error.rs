use utils::database::DatabaseError;
use utils::http::RouteError;

use crate::log_entry::LogError;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("failed to read http body: {0}")]
	ReadHttpBody(BoxError),
	#[error("failed to parse json body: {0}")]
	ParseJson(#[from] serde_json::Error),
	#[error("request body is null")]
	NullBody,
	#[error("database error: {0}")]
	Database(#[from] DatabaseError),
	#[error("log error: {0}")]
	Log(#[from] LogError),
}
