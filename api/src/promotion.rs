use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use utils::database::{timestamp, DatabaseError, JsonParam, RowMap, SqlValue, Store};

const PROMOTION_QUERY: &str = "SELECT message, start_time, end_time FROM Promotions WHERE start_time <= $1 AND end_time >= $2";

/// Messages of every promotion whose window contains the current time, in
/// query order.
pub async fn fetch_active(store: &dyn Store) -> Result<Vec<String>, DatabaseError> {
	fetch_active_at(store, Utc::now()).await
}

pub async fn fetch_active_at(store: &dyn Store, now: DateTime<Utc>) -> Result<Vec<String>, DatabaseError> {
	// Bound as JSON so it encodes as whichever timestamp type the columns use.
	let param = JsonParam(json!(now.to_rfc3339()));

	let rows = match store.query(PROMOTION_QUERY, &[&param, &param]).await {
		Ok(rows) => rows,
		Err(err) if err.is_connection() => return Err(err),
		Err(err) => {
			tracing::error!(error = %err, "error fetching promotions");
			return Ok(Vec::new());
		}
	};

	Ok(rows.iter().filter_map(|row| active_message(row, now)).collect())
}

#[derive(Debug)]
struct Promotion {
	message: String,
	start_time: DateTime<Utc>,
	end_time: DateTime<Utc>,
}

fn active_message(row: &RowMap, now: DateTime<Utc>) -> Option<String> {
	let promotion = match parse_row(row) {
		Ok(promotion) => promotion,
		Err(column) => {
			tracing::error!(column, row = ?row, "error processing promotion");
			return None;
		}
	};

	if promotion.start_time <= now && now <= promotion.end_time {
		Some(promotion.message)
	} else {
		tracing::warn!(promotion = ?promotion, "skipped promotion outside active period");
		None
	}
}

/// On failure returns the offending column.
fn parse_row(row: &RowMap) -> Result<Promotion, &'static str> {
	Ok(Promotion {
		message: row
			.get("message")
			.and_then(SqlValue::as_str)
			.ok_or("message")?
			.to_owned(),
		start_time: window_bound(row, "start_time")?,
		end_time: window_bound(row, "end_time")?,
	})
}

fn window_bound(row: &RowMap, column: &'static str) -> Result<DateTime<Utc>, &'static str> {
	match row.get(column) {
		Some(SqlValue::Timestamp(naive)) => Ok(Utc.from_utc_datetime(naive)),
		Some(SqlValue::TimestampTz(dt)) => Ok(*dt),
		Some(SqlValue::Text(text)) => timestamp::parse_iso8601(text).ok_or(column),
		_ => Err(column),
	}
}
