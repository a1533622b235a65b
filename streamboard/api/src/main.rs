use std::sync::Arc;

use anyhow::Context as _;
use binary_helper::global::setup_database;
use binary_helper::{bootstrap, impl_global_traits};
use streamboard_api::blob::{BlobStore, LocalBlobStore};
use streamboard_api::config::{ApiConfig, JwtConfig, MediaConfig};
use streamboard_api::database::Repositories;
use streamboard_api::store::{StreamboardStore, UserStore};
use utils::context::Context;

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct ExtConfig {
	/// The API configuration.
	api: ApiConfig,

	/// Token signing configuration.
	jwt: JwtConfig,

	/// Uploaded file storage.
	media: MediaConfig,
}

impl binary_helper::config::ConfigExtention for ExtConfig {
	const APP_NAME: &'static str = "streamboard-api";
}

type AppConfig = binary_helper::config::AppConfig<ExtConfig>;

struct GlobalState {
	ctx: Context,
	config: AppConfig,
	users: UserStore,
	streamboards: StreamboardStore,
	blobs: Arc<dyn BlobStore>,
}

impl_global_traits!(GlobalState);

impl binary_helper::global::GlobalConfigProvider<ApiConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &ApiConfig {
		&self.config.extra.api
	}
}

impl binary_helper::global::GlobalConfigProvider<JwtConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &JwtConfig {
		&self.config.extra.jwt
	}
}

impl binary_helper::global::GlobalConfigProvider<MediaConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &MediaConfig {
		&self.config.extra.media
	}
}

impl streamboard_api::global::ApiState for GlobalState {
	#[inline(always)]
	fn users(&self) -> &UserStore {
		&self.users
	}

	#[inline(always)]
	fn streamboards(&self) -> &StreamboardStore {
		&self.streamboards
	}

	#[inline(always)]
	fn blobs(&self) -> &Arc<dyn BlobStore> {
		&self.blobs
	}
}

impl binary_helper::Global<AppConfig> for GlobalState {
	async fn new(ctx: Context, config: AppConfig) -> anyhow::Result<Self> {
		if config.extra.jwt.secret == JwtConfig::default().secret {
			tracing::warn!("jwt.secret is set to its default value, tokens can be forged");
		}

		let repos = if config.database.is_memory() {
			tracing::warn!("using the in-memory repository, nothing will be persisted");
			Repositories::memory()
		} else {
			Repositories::postgres(setup_database(&config.database)?)
		};

		tokio::fs::create_dir_all(&config.extra.media.root)
			.await
			.context("failed to create media root")?;

		let blobs = Arc::new(LocalBlobStore::new(
			config.extra.media.root.clone(),
			config.extra.media.url.clone(),
		));

		Ok(Self {
			ctx,
			users: UserStore::new(repos.users),
			streamboards: StreamboardStore::new(repos.streamboards),
			blobs,
			config,
		})
	}
}

#[tokio::main]
pub async fn main() {
	if let Err(err) = bootstrap::<AppConfig, GlobalState, _>(|global| async move {
		streamboard_api::api::run(global).await.context("api server stopped unexpectedly")
	})
	.await
	{
		tracing::error!("{:#}", err);
		std::process::exit(1);
	}
}
