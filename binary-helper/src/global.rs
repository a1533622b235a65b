use std::sync::{Arc, Weak};

use anyhow::Context as _;
use bytes::Bytes;
use deadpool_postgres::{ManagerConfig, PoolConfig, RecyclingMethod, Runtime};
use hyper::StatusCode;
use tokio_postgres::NoTls;
use utils::database::Pool;
use utils::http::RouteError;

use crate::config::{Config, DatabaseConfig};

/// State shared by every task of a service, built once from its config.
#[allow(async_fn_in_trait)]
pub trait Global<C: Config>: Sized {
	async fn new(ctx: utils::context::Context, config: C) -> anyhow::Result<Self>;
}

/// Implements the accessor traits for a global state struct with `ctx` and
/// `config` fields.
#[macro_export]
macro_rules! impl_global_traits {
	($struct:ty) => {
		impl binary_helper::global::GlobalCtx for $struct {
			#[inline(always)]
			fn ctx(&self) -> &utils::context::Context {
				&self.ctx
			}
		}

		impl binary_helper::global::GlobalConfig for $struct {}
	};
}

pub trait GlobalCtx {
	fn ctx(&self) -> &utils::context::Context;
}

pub trait GlobalConfig {
	#[inline(always)]
	fn config<C>(&self) -> &C
	where
		Self: GlobalConfigProvider<C>,
	{
		GlobalConfigProvider::provide_config(self)
	}
}

pub trait GlobalConfigProvider<C> {
	fn provide_config(&self) -> &C;
}

pub fn setup_database(config: &DatabaseConfig) -> anyhow::Result<Arc<Pool>> {
	let pg_config = config
		.uri
		.parse::<tokio_postgres::Config>()
		.context("invalid database uri")?;

	let manager = deadpool_postgres::Manager::from_config(
		pg_config,
		NoTls,
		ManagerConfig {
			recycling_method: RecyclingMethod::Fast,
		},
	);

	Ok(Arc::new(
		Pool::builder(manager)
			.config(PoolConfig::new(config.pool_size))
			.runtime(Runtime::Tokio1)
			.build()
			.context("failed to create database pool")?,
	))
}

pub trait RequestGlobalExt<E> {
	fn get_global<G: Sync + Send + 'static, B: From<Bytes>>(&self) -> std::result::Result<Arc<G>, RouteError<E, B>>;
}

impl<E, B> RequestGlobalExt<E> for hyper::Request<B> {
	fn get_global<G: Sync + Send + 'static, B2: From<Bytes>>(&self) -> std::result::Result<Arc<G>, RouteError<E, B2>> {
		self.extensions()
			.get::<Weak<G>>()
			.and_then(Weak::upgrade)
			.ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "failed to upgrade global state").into())
	}
}
