use std::sync::Arc;

use crate::blob::BlobStore;
use crate::config::{ApiConfig, JwtConfig, MediaConfig};
use crate::store::{StreamboardStore, UserStore};

pub trait ApiState {
	fn users(&self) -> &UserStore;
	fn streamboards(&self) -> &StreamboardStore;
	fn blobs(&self) -> &Arc<dyn BlobStore>;
}

pub trait ApiGlobal:
	binary_helper::global::GlobalCtx
	+ binary_helper::global::GlobalConfigProvider<ApiConfig>
	+ binary_helper::global::GlobalConfigProvider<JwtConfig>
	+ binary_helper::global::GlobalConfigProvider<MediaConfig>
	+ binary_helper::global::GlobalConfig
	+ ApiState
	+ Send
	+ Sync
	+ 'static
{
}

impl<T> ApiGlobal for T where
	T: binary_helper::global::GlobalCtx
		+ binary_helper::global::GlobalConfigProvider<ApiConfig>
		+ binary_helper::global::GlobalConfigProvider<JwtConfig>
		+ binary_helper::global::GlobalConfigProvider<MediaConfig>
		+ binary_helper::global::GlobalConfig
		+ ApiState
		+ Send
		+ Sync
		+ 'static
{
}
