use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub type AppConfig = binary_helper::config::AppConfig<ApiConfig>;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiConfig {
	/// Bind address for the API
	pub bind_address: SocketAddr,

	/// When set, every accepted log payload is also written to this directory
	pub log_archive_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 5175)),
			log_archive_dir: None,
		}
	}
}

impl binary_helper::config::ConfigExtension for ApiConfig {
	const APP_NAME: &'static str = "licensing-api";
}
