use std::path::{Path, PathBuf};

use crate::logging::Mode;
use crate::traits::Config;

/// Selects the section of the config file to load.
pub const ENV_VAR: &str = "ENV";
/// Overrides the config file location.
pub const CONFIG_FILE_VAR: &str = "CONFIG_FILE";

pub const DEFAULT_ENV: &str = "development";
pub const DEFAULT_CONFIG_FILE: &str = "db_config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse config file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("environment '{env}' not found in {path}")]
	MissingEnvironment { env: String, path: PathBuf },
	#[error("invalid config: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AppConfig<T> {
	/// The environment this config was loaded for
	#[serde(skip)]
	pub env: String,

	/// The file this config was loaded from
	#[serde(skip)]
	pub config_file: PathBuf,

	/// The logging configuration
	#[serde(default)]
	pub logging: LoggingConfig,

	/// The database configuration
	#[serde(flatten)]
	pub database: DatabaseConfig,

	#[serde(flatten)]
	pub extra: T,
}

pub trait ConfigExtension: Sized {
	const APP_NAME: &'static str;

	fn pre_hook(_config: &mut AppConfig<Self>) -> anyhow::Result<()> {
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level filter, in `tracing_subscriber::EnvFilter` syntax
	pub level: String,

	/// The log output format
	pub mode: Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_owned(),
			mode: Mode::Default,
		}
	}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
	#[default]
	Disable,
	Prefer,
	Require,
	VerifyCa,
	VerifyFull,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct DatabaseConfig {
	pub host: String,

	pub database: String,

	pub user: String,

	#[serde(default)]
	pub password: Option<String>,

	#[serde(default = "default_port")]
	pub port: u16,

	#[serde(default)]
	pub sslmode: SslMode,

	/// PEM bundle used to verify the server certificate
	#[serde(default)]
	pub sslrootcert: Option<PathBuf>,
}

fn default_port() -> u16 {
	5432
}

impl<T: ConfigExtension + serde::de::DeserializeOwned> AppConfig<T> {
	/// Loads the `env` section of the JSON file at `path`.
	pub fn load(path: impl AsRef<Path>, env: &str) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_owned(),
			source,
		})?;

		let mut sections: serde_json::Map<String, serde_json::Value> =
			serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
				path: path.to_owned(),
				source,
			})?;

		let section = sections.remove(env).ok_or_else(|| ConfigError::MissingEnvironment {
			env: env.to_owned(),
			path: path.to_owned(),
		})?;

		let mut config: Self = serde_json::from_value(section).map_err(|source| ConfigError::Parse {
			path: path.to_owned(),
			source,
		})?;

		config.env = env.to_owned();
		config.config_file = path.to_owned();

		config.validate()?;

		Ok(config)
	}

	/// Loads using the `ENV` and `CONFIG_FILE` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		let env = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_owned());
		let path = std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());

		Self::load(path, &env)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.database.sslmode != SslMode::Disable && self.database.sslrootcert.is_none() {
			return Err(ConfigError::Invalid(format!(
				"sslrootcert is required when sslmode is {:?}",
				self.database.sslmode
			)));
		}

		Ok(())
	}
}

impl<T: ConfigExtension + serde::de::DeserializeOwned> Config for AppConfig<T> {
	fn parse() -> anyhow::Result<Self> {
		Ok(Self::from_env()?)
	}

	fn logging(&self) -> &LoggingConfig {
		&self.logging
	}

	fn name(&self) -> &str {
		T::APP_NAME
	}

	fn pre_hook(&mut self) -> anyhow::Result<()> {
		T::pre_hook(self)
	}
}
