use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use utils::database::{timestamp, DatabaseError, JsonParam, Store};

/// Columns of `Logs`, in insert order. Every one must be present in a payload
/// after normalization.
pub const REQUIRED_FIELDS: [&str; 14] = [
	"ip",
	"machine_name",
	"os",
	"os_version",
	"machine",
	"start_time",
	"end_time",
	"file_size",
	"video_length",
	"processing_time",
	"type",
	"function_type",
	"status",
	"error_logs",
];

/// Fields whose null value is replaced by `0`. Every other field gets `""`.
const NUMERIC_FIELDS: [&str; 3] = ["file_size", "video_length", "processing_time"];

const MACHINE_SPEC_FIELDS: [&str; 3] = ["os", "os_version", "machine"];

const UNKNOWN: &str = "Unknown";

const INSERT_LOG: &str = "INSERT INTO Logs (ip, machine_name, os, os_version, machine, start_time, end_time, file_size, \
                          video_length, processing_time, type, function_type, status, error_logs) VALUES ($1, $2, $3, \
                          $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)";

pub type LogEntry = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
	#[error("missing required log field: {0}")]
	Validation(&'static str),
	#[error("failed to save log to database: {0}")]
	Persistence(#[from] DatabaseError),
}

/// Flattens `machine_specs` into top-level fields and fills explicit nulls.
pub fn normalize(mut entry: LogEntry) -> Result<LogEntry, LogError> {
	let specs = match entry.get("machine_specs") {
		Some(Value::Object(specs)) => specs.clone(),
		_ => Map::new(),
	};

	for field in MACHINE_SPEC_FIELDS {
		let value = specs.get(field).cloned().unwrap_or_else(|| Value::from(UNKNOWN));
		entry.insert(field.to_owned(), value);
	}

	for field in REQUIRED_FIELDS {
		match entry.get_mut(field) {
			None => {
				tracing::error!(field, "missing required log field");
				return Err(LogError::Validation(field));
			}
			Some(value @ Value::Null) => {
				tracing::warn!(field, "log field is null, using default");
				*value = null_default(field);
			}
			Some(_) => {}
		}
	}

	Ok(entry)
}

fn null_default(field: &str) -> Value {
	if NUMERIC_FIELDS.contains(&field) {
		Value::from(0)
	} else {
		Value::from("")
	}
}

/// Normalizes and inserts one log entry, returning the normalized entry.
pub async fn save(store: &dyn Store, entry: LogEntry) -> Result<LogEntry, LogError> {
	let entry = normalize(entry)?;

	tracing::debug!(entry = ?entry, "prepared log entry for insertion");

	let params = REQUIRED_FIELDS
		.iter()
		.map(|field| JsonParam(entry.get(*field).cloned().unwrap_or(Value::Null)))
		.collect::<Vec<_>>();

	let params = params
		.iter()
		.map(|param| param as &(dyn utils::database::ToSql + Sync))
		.collect::<Vec<_>>();

	store.execute(INSERT_LOG, &params).await.map_err(|err| {
		tracing::error!(error = %err, "error saving log to database");
		LogError::Persistence(err)
	})?;

	tracing::info!("log saved to the database");

	Ok(entry)
}

/// The archive file name for an entry: `{ip}_{start}.json`.
pub fn archive_file_name(entry: &LogEntry) -> String {
	let ip = entry.get("ip").map(render).unwrap_or_default();

	let start = entry.get("start_time").map(render).unwrap_or_default();
	let start = match timestamp::parse_timestamp(&start) {
		Some(start) => start.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
		None => start,
	};

	format!("{}_{}.json", sanitize(&ip), sanitize(&start).replace([':', '.'], "-"))
}

fn render(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Keeps the name inside the archive directory.
fn sanitize(part: &str) -> String {
	part.chars()
		.map(|c| match c {
			'/' | '\\' | '\0' => '-',
			c => c,
		})
		.collect()
}

/// Writes `entry` as pretty JSON under `dir`.
pub async fn archive(dir: &Path, entry: &LogEntry) -> std::io::Result<PathBuf> {
	let path = dir.join(archive_file_name(entry));

	let contents = serde_json::to_vec_pretty(entry)?;
	tokio::fs::write(&path, contents).await?;

	tracing::info!(path = %path.display(), "log archived");

	Ok(path)
}
