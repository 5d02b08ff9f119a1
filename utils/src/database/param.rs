use std::error::Error;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use super::timestamp::parse_timestamp;

/// A JSON value bound as a statement parameter. The encoding follows the type
/// the server inferred for the parameter, so one payload value can fill a
/// text, numeric or timestamp column alike.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonParam(pub serde_json::Value);

#[derive(Debug, thiserror::Error)]
#[error("cannot encode {value} as {target}")]
pub struct EncodeError {
	pub target: String,
	pub value: String,
}

impl JsonParam {
	fn text(&self) -> String {
		match &self.0 {
			serde_json::Value::String(s) => s.clone(),
			other => other.to_string(),
		}
	}

	fn integer(&self) -> Option<i64> {
		match &self.0 {
			// Fractions round half away from zero, as the server's numeric to integer cast does.
			serde_json::Value::Number(n) => n
				.as_i64()
				.or_else(|| n.as_f64().map(f64::round).filter(|f| f.abs() < i64::MAX as f64).map(|f| f as i64)),
			serde_json::Value::String(s) => s.trim().parse().ok(),
			serde_json::Value::Bool(b) => Some(i64::from(*b)),
			_ => None,
		}
	}

	fn float(&self) -> Option<f64> {
		match &self.0 {
			serde_json::Value::Number(n) => n.as_f64(),
			serde_json::Value::String(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	fn decimal(&self) -> Option<Decimal> {
		let text = match &self.0 {
			serde_json::Value::Number(n) => n.to_string(),
			serde_json::Value::String(s) => s.trim().to_owned(),
			_ => return None,
		};

		Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
	}

	fn boolean(&self) -> Option<bool> {
		match &self.0 {
			serde_json::Value::Bool(b) => Some(*b),
			serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
				"true" | "t" | "1" => Some(true),
				"false" | "f" | "0" => Some(false),
				_ => None,
			},
			_ => None,
		}
	}

	fn encode_error(&self, ty: &Type) -> Box<dyn Error + Sync + Send> {
		Box::new(EncodeError {
			target: ty.name().to_owned(),
			value: self.0.to_string(),
		})
	}
}

impl From<serde_json::Value> for JsonParam {
	fn from(value: serde_json::Value) -> Self {
		Self(value)
	}
}

impl ToSql for JsonParam {
	fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
		if self.0.is_null() {
			return Ok(IsNull::Yes);
		}

		let fail = || self.encode_error(ty);

		match ty.name() {
			"text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => self.text().to_sql(ty, out),
			"bool" => self.boolean().ok_or_else(fail)?.to_sql(ty, out),
			"int2" => i16::try_from(self.integer().ok_or_else(fail)?)
				.map_err(|_| fail())?
				.to_sql(ty, out),
			"int4" => i32::try_from(self.integer().ok_or_else(fail)?)
				.map_err(|_| fail())?
				.to_sql(ty, out),
			"int8" => self.integer().ok_or_else(fail)?.to_sql(ty, out),
			"float4" => (self.float().ok_or_else(fail)? as f32).to_sql(ty, out),
			"float8" => self.float().ok_or_else(fail)?.to_sql(ty, out),
			"numeric" => self.decimal().ok_or_else(fail)?.to_sql(ty, out),
			"timestamp" => parse_timestamp(&self.text()).ok_or_else(fail)?.naive_utc().to_sql(ty, out),
			"timestamptz" => parse_timestamp(&self.text()).ok_or_else(fail)?.to_sql(ty, out),
			"date" => NaiveDate::parse_from_str(self.text().trim(), "%Y-%m-%d")
				.ok()
				.or_else(|| parse_timestamp(&self.text()).map(|dt| dt.date_naive()))
				.ok_or_else(fail)?
				.to_sql(ty, out),
			"json" | "jsonb" => self.0.to_sql(ty, out),
			_ => Err(fail()),
		}
	}

	fn accepts(_: &Type) -> bool {
		true
	}

	to_sql_checked!();
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn encode(value: serde_json::Value, ty: &Type) -> Result<(IsNull, BytesMut), Box<dyn Error + Sync + Send>> {
		let mut out = BytesMut::new();
		let is_null = JsonParam(value).to_sql(ty, &mut out)?;
		Ok((is_null, out))
	}

	#[test]
	fn test_null_is_sql_null() {
		let (is_null, out) = encode(json!(null), &Type::INT8).expect("null should encode");
		assert!(matches!(is_null, IsNull::Yes));
		assert!(out.is_empty());
	}

	#[test]
	fn test_text_encoding() {
		let (_, out) = encode(json!("Linux"), &Type::TEXT).expect("text should encode");
		assert_eq!(&out[..], b"Linux");

		// Non-string values are rendered as their JSON text.
		let (_, out) = encode(json!(42), &Type::VARCHAR).expect("number should encode as text");
		assert_eq!(&out[..], b"42");
	}

	#[test]
	fn test_integer_encoding() {
		let (_, out) = encode(json!(1024), &Type::INT8).expect("int8 should encode");
		assert_eq!(&out[..], &1024i64.to_be_bytes());

		let (_, out) = encode(json!(7.0), &Type::INT4).expect("whole float should encode");
		assert_eq!(&out[..], &7i32.to_be_bytes());

		let (_, out) = encode(json!("12"), &Type::INT2).expect("numeric string should encode");
		assert_eq!(&out[..], &12i16.to_be_bytes());

		assert!(encode(json!(70000), &Type::INT2).is_err());
		let (_, out) = encode(json!(12.5), &Type::INT4).expect("fractional number should round");
		assert_eq!(&out[..], &13i32.to_be_bytes());

		let (_, out) = encode(json!(-2.4), &Type::INT8).expect("fractional number should round");
		assert_eq!(&out[..], &(-2i64).to_be_bytes());

		assert!(encode(json!(1e300), &Type::INT8).is_err());
		assert!(encode(json!("abc"), &Type::INT8).is_err());
	}

	#[test]
	fn test_float_and_numeric_encoding() {
		let (_, out) = encode(json!(1.5), &Type::FLOAT8).expect("float8 should encode");
		assert_eq!(&out[..], &1.5f64.to_be_bytes());

		assert!(encode(json!(12.25), &Type::NUMERIC).is_ok());
		assert!(encode(json!("0"), &Type::NUMERIC).is_ok());
		assert!(encode(json!([1]), &Type::NUMERIC).is_err());
	}

	#[test]
	fn test_timestamp_encoding() {
		assert!(encode(json!("2024-01-02T03:04:05Z"), &Type::TIMESTAMP).is_ok());
		assert!(encode(json!("2024-01-02 03:04:05"), &Type::TIMESTAMPTZ).is_ok());
		assert!(encode(json!("2024-01-02"), &Type::DATE).is_ok());

		let err = encode(json!("yesterday"), &Type::TIMESTAMP).err().expect("garbage should fail");
		let err = err.downcast::<EncodeError>().expect("should be an encode error");
		assert_eq!(err.target, "timestamp");
		assert_eq!(err.value, "\"yesterday\"");
	}

	#[test]
	fn test_json_encoding() {
		assert!(encode(json!({ "os": "Linux" }), &Type::JSONB).is_ok());
		assert!(encode(json!(true), &Type::BOOL).is_ok());
		assert!(encode(json!("x"), &Type::INET).is_err());
	}
}
