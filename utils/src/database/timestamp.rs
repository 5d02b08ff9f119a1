use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::SqlValue;

// Date and time may be separated by `T` or a space, which is how PostgreSQL
// renders timestamps as text. `%#z` takes `+hh`, `+hhmm` and `+hh:mm`.
const OFFSET_FORMATS: &[&str] = &[
	"%Y-%m-%dT%H:%M:%S%.f%#z",
	"%Y-%m-%d %H:%M:%S%.f%#z",
	"%Y-%m-%dT%H:%M%#z",
	"%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
	"%Y-%m-%dT%H:%M:%S%.f",
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%d %H:%M:%S%.fZ",
	"%Y-%m-%dT%H:%M",
	"%Y-%m-%d %H:%M",
];

/// The pattern tried after ISO-8601 parsing fails.
pub const FALLBACK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses an ISO-8601 date or date-time, with `T` or a space between date and
/// time. Values without an offset are taken as UTC, values with one are
/// converted to UTC.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
	let value = value.trim();

	if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
		return Some(dt.with_timezone(&Utc));
	}

	if let Some(dt) = OFFSET_FORMATS
		.iter()
		.find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
	{
		return Some(dt.with_timezone(&Utc));
	}

	if let Some(dt) = NAIVE_FORMATS
		.iter()
		.find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
	{
		return Some(Utc.from_utc_datetime(&dt));
	}

	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|dt| Utc.from_utc_datetime(&dt))
}

/// ISO-8601 first, then [`FALLBACK_FORMAT`].
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
	parse_iso8601(value).or_else(|| {
		NaiveDateTime::parse_from_str(value.trim(), FALLBACK_FORMAT)
			.ok()
			.map(|dt| Utc.from_utc_datetime(&dt))
	})
}

/// Resolves a column value to a UTC instant. Only timestamps and strings are
/// accepted; `None` for anything else, including null.
pub fn from_sql_value(value: &SqlValue) -> Option<DateTime<Utc>> {
	match value {
		SqlValue::Timestamp(naive) => Some(Utc.from_utc_datetime(naive)),
		SqlValue::TimestampTz(dt) => Some(*dt),
		SqlValue::Text(text) => parse_timestamp(text),
		_ => None,
	}
}
