use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::Row;

use super::DatabaseError;

/// A single column value, decoded according to the column's PostgreSQL type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Numeric(Decimal),
	Text(String),
	/// `timestamp without time zone`
	Timestamp(NaiveDateTime),
	/// `timestamp with time zone`
	TimestampTz(DateTime<Utc>),
	Date(NaiveDate),
	Json(serde_json::Value),
	/// A non-null value of a type this service does not decode, by type name.
	Unsupported(String),
}

impl SqlValue {
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	/// The PostgreSQL-ish name of the variant, used in log messages.
	pub fn kind(&self) -> &str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Int(_) => "integer",
			Self::Float(_) => "float",
			Self::Numeric(_) => "numeric",
			Self::Text(_) => "text",
			Self::Timestamp(_) => "timestamp",
			Self::TimestampTz(_) => "timestamptz",
			Self::Date(_) => "date",
			Self::Json(_) => "json",
			Self::Unsupported(name) => name,
		}
	}
}

impl From<&str> for SqlValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}

impl From<String> for SqlValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<NaiveDateTime> for SqlValue {
	fn from(value: NaiveDateTime) -> Self {
		Self::Timestamp(value)
	}
}

impl From<DateTime<Utc>> for SqlValue {
	fn from(value: DateTime<Utc>) -> Self {
		Self::TimestampTz(value)
	}
}

/// One result row as an ordered column name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap(Vec<(String, SqlValue)>);

impl RowMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder style [`RowMap::insert`].
	pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
		self.insert(column, value);
		self
	}

	/// Sets `column`, replacing any previous value under the same name.
	pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
		let column = column.into();
		let value = value.into();

		match self.0.iter_mut().find(|(name, _)| *name == column) {
			Some((_, slot)) => *slot = value,
			None => self.0.push((column, value)),
		}
	}

	pub fn get(&self, column: &str) -> Option<&SqlValue> {
		self.0.iter().find(|(name, _)| name == column).map(|(_, value)| value)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn from_row(row: &Row) -> Result<Self, DatabaseError> {
		row.columns()
			.iter()
			.enumerate()
			.map(|(idx, column)| {
				decode(row, idx, column.type_())
					.map(|value| (column.name().to_owned(), value))
					.map_err(|err| DatabaseError::Decode {
						column: column.name().to_owned(),
						source: Box::new(err),
					})
			})
			.collect::<Result<Vec<_>, _>>()
			.map(Self)
	}
}

/// Accepts any column type without looking at the bytes.
struct Opaque;

impl<'a> FromSql<'a> for Opaque {
	fn from_sql(_: &Type, _: &'a [u8]) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
		Ok(Opaque)
	}

	fn accepts(_: &Type) -> bool {
		true
	}
}

fn decode(row: &Row, idx: usize, ty: &Type) -> Result<SqlValue, tokio_postgres::Error> {
	let value = match ty.name() {
		"bool" => row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool),
		"int2" => row.try_get::<_, Option<i16>>(idx)?.map(|v| SqlValue::Int(v.into())),
		"int4" => row.try_get::<_, Option<i32>>(idx)?.map(|v| SqlValue::Int(v.into())),
		"int8" => row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::Int),
		"float4" => row.try_get::<_, Option<f32>>(idx)?.map(|v| SqlValue::Float(v.into())),
		"float8" => row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::Float),
		"numeric" => row.try_get::<_, Option<Decimal>>(idx)?.map(SqlValue::Numeric),
		"text" | "varchar" | "bpchar" | "name" => row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text),
		"timestamp" => row.try_get::<_, Option<NaiveDateTime>>(idx)?.map(SqlValue::Timestamp),
		"timestamptz" => row.try_get::<_, Option<DateTime<Utc>>>(idx)?.map(SqlValue::TimestampTz),
		"date" => row.try_get::<_, Option<NaiveDate>>(idx)?.map(SqlValue::Date),
		"json" | "jsonb" => row.try_get::<_, Option<serde_json::Value>>(idx)?.map(SqlValue::Json),
		other => row
			.try_get::<_, Option<Opaque>>(idx)?
			.map(|_| SqlValue::Unsupported(other.to_owned())),
	};

	Ok(value.unwrap_or(SqlValue::Null))
}
