use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

type ReloadHandle = Box<dyn Fn(&str) -> Result<(), LoggingError> + Sync + Send>;

static RELOAD_HANDLE: OnceCell<ReloadHandle> = OnceCell::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	#[default]
	Default,
	Json,
	Pretty,
	Compact,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
	#[error("invalid log filter: {0}")]
	InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
	#[error("failed to init logger: {0}")]
	Init(#[from] tracing_subscriber::util::TryInitError),
	#[error("failed to reload logger: {0}")]
	Reload(#[from] tracing_subscriber::reload::Error),
}

/// Installs a reloadable filter on `$builder` as the global subscriber and
/// yields the closure that swaps the filter.
macro_rules! install {
	($builder:expr, $filter:expr) => {{
		let builder = $builder
			.with_line_number(true)
			.with_file(true)
			.with_env_filter($filter)
			.with_filter_reloading();

		let handle = builder.reload_handle();

		builder.finish().try_init()?;

		Ok::<_, LoggingError>(Box::new(move |level: &str| {
			handle.reload(EnvFilter::from_str(level)?)?;
			Ok(())
		}) as ReloadHandle)
	}};
}

/// Sets up the global subscriber on the first call. The output mode is fixed
/// at that point; later calls only change the filter.
pub fn init(level: &str, mode: Mode) -> Result<(), LoggingError> {
	let reload = RELOAD_HANDLE.get_or_try_init(|| {
		let filter = EnvFilter::from_str(level)?;

		match mode {
			Mode::Default => install!(tracing_subscriber::fmt(), filter),
			Mode::Json => install!(tracing_subscriber::fmt().json(), filter),
			Mode::Pretty => install!(tracing_subscriber::fmt().pretty(), filter),
			Mode::Compact => install!(tracing_subscriber::fmt().compact(), filter),
		}
	})?;

	reload(level)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_init_and_reload() {
		init("info", Mode::Compact).expect("failed to init logging");
		init("licensing_api=debug", Mode::Json).expect("failed to reload filter");

		assert!(matches!(init("licensing_api=loud", Mode::Default), Err(LoggingError::InvalidFilter(_))));
	}

	#[test]
	fn test_mode_deserialize() {
		let mode: Mode = serde_json::from_str("\"pretty\"").expect("failed to parse mode");
		assert_eq!(mode, Mode::Pretty);
		assert!(serde_json::from_str::<Mode>("\"xml\"").is_err());
	}
}
