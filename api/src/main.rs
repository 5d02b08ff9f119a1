use std::sync::Arc;

use anyhow::Context as _;
use binary_helper::global::setup_database;
use binary_helper::{bootstrap, impl_global_traits};
use licensing_api::config::{ApiConfig, AppConfig};
use utils::context::Context;
use utils::database::Store;

struct GlobalState {
	ctx: Context,
	config: AppConfig,
	db: Arc<dyn Store>,
}

impl_global_traits!(GlobalState);

impl binary_helper::global::GlobalConfigProvider<ApiConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &ApiConfig {
		&self.config.extra
	}
}

impl binary_helper::Global<AppConfig> for GlobalState {
	async fn new(ctx: Context, config: AppConfig) -> anyhow::Result<Self> {
		tracing::info!(env = %config.env, file = %config.config_file.display(), "configuration loaded");

		let db = setup_database(&config.database).await?;

		if let Some(dir) = &config.extra.log_archive_dir {
			tokio::fs::create_dir_all(dir)
				.await
				.with_context(|| format!("failed to create log archive directory {}", dir.display()))?;
		}

		Ok(Self {
			ctx,
			config,
			db: Arc::new(db),
		})
	}
}

#[tokio::main]
pub async fn main() {
	if let Err(err) = bootstrap::<AppConfig, GlobalState, _>(|global| async move {
		licensing_api::api::run(global).await.context("api server stopped unexpectedly")
	})
	.await
	{
		tracing::error!("{:#}", err);
		std::process::exit(1);
	}
}
