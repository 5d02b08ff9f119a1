use chrono::{DateTime, Utc};
use utils::database::{timestamp, DatabaseError, RowMap, SqlValue, Store};

const LICENSE_QUERY: &str = "SELECT license_key, status, expires_at FROM Licenses WHERE client_id = $1";

pub const REASON_NOT_FOUND: &str = "License not found";
pub const REASON_INVALID_KEY: &str = "Invalid license key";
pub const REASON_EXPIRED: &str = "License expired";
pub const REASON_VALIDATION_ERROR: &str = "Validation error";

/// Outcome of checking a license. `reason` is set whenever `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LicenseCheck {
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl LicenseCheck {
	pub fn valid() -> Self {
		Self {
			valid: true,
			reason: None,
		}
	}

	pub fn invalid(reason: impl Into<String>) -> Self {
		Self {
			valid: false,
			reason: Some(reason.into()),
		}
	}

	/// Why the license was rejected, or `None` when it is valid. An invalid
	/// check without a reason is reported as a validation error.
	pub fn rejection(&self) -> Option<&str> {
		match self.valid {
			true => None,
			false => Some(self.reason.as_deref().unwrap_or(REASON_VALIDATION_ERROR)),
		}
	}
}

/// Checks the license stored for `client_id` against `license_key`.
///
/// Only a failure to reach the database is returned as an error; every other
/// failure is reported as an invalid check with a generic reason.
pub async fn validate(store: &dyn Store, client_id: &str, license_key: &str) -> Result<LicenseCheck, DatabaseError> {
	validate_at(store, client_id, license_key, Utc::now()).await
}

pub async fn validate_at(
	store: &dyn Store,
	client_id: &str,
	license_key: &str,
	now: DateTime<Utc>,
) -> Result<LicenseCheck, DatabaseError> {
	let rows = match store.query(LICENSE_QUERY, &[&client_id]).await {
		Ok(rows) => rows,
		Err(err) if err.is_connection() => return Err(err),
		Err(err) => {
			tracing::error!(error = %err, "error validating license");
			return Ok(LicenseCheck::invalid(REASON_VALIDATION_ERROR));
		}
	};

	let Some(row) = rows.first() else {
		tracing::warn!(client_id, "no license found");
		return Ok(LicenseCheck::invalid(REASON_NOT_FOUND));
	};

	Ok(check_row(row, license_key, now))
}

fn check_row(row: &RowMap, license_key: &str, now: DateTime<Utc>) -> LicenseCheck {
	if row.get("license_key").and_then(SqlValue::as_str) != Some(license_key) {
		return LicenseCheck::invalid(REASON_INVALID_KEY);
	}

	let Some(status) = row.get("status").and_then(SqlValue::as_str) else {
		tracing::error!(status = ?row.get("status"), "license status is not text");
		return LicenseCheck::invalid(REASON_VALIDATION_ERROR);
	};

	let status = status.to_lowercase();
	if status != "active" {
		return LicenseCheck::invalid(format!("License {status}"));
	}

	let expires_at = row.get("expires_at").unwrap_or(&SqlValue::Null);
	let Some(expires_at) = timestamp::from_sql_value(expires_at) else {
		tracing::error!(kind = expires_at.kind(), value = ?expires_at, "unexpected expires_at value");
		return LicenseCheck::invalid(REASON_VALIDATION_ERROR);
	};

	if expires_at < now {
		return LicenseCheck::invalid(REASON_EXPIRED);
	}

	LicenseCheck::valid()
}
