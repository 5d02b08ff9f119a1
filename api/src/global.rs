use crate::config::ApiConfig;

pub trait ApiGlobal:
	binary_helper::global::GlobalCtx
	+ binary_helper::global::GlobalConfigProvider<ApiConfig>
	+ binary_helper::global::GlobalDb
	+ binary_helper::global::GlobalConfig
	+ Send
	+ Sync
	+ 'static
{
}

impl<T> ApiGlobal for T where
	T: binary_helper::global::GlobalCtx
		+ binary_helper::global::GlobalConfigProvider<ApiConfig>
		+ binary_helper::global::GlobalDb
		+ binary_helper::global::GlobalConfig
		+ Send
		+ Sync
		+ 'static
{
}
