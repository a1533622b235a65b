use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::signal::unix::SignalKind;
use tokio::{select, time};
use utils::context::Context;
use utils::signal;

pub use self::config::Config;
pub use self::global::Global;

pub mod config;
pub mod global;
pub mod logging;

#[cfg(test)]
mod tests;

/// Runs a service: parses config, sets up logging and the global state, then
/// drives `process` until a shutdown signal arrives or it exits on its own.
pub async fn bootstrap<C: Config, G: Global<C>, F: Future<Output = anyhow::Result<()>> + Send + 'static>(
	process: impl FnOnce(Arc<G>) -> F,
) -> anyhow::Result<()> {
	let (ctx, handler) = Context::new();

	let config = C::load()
		.map_err(|err| {
			if let Err(err) = logging::init("trace", Default::default()) {
				eprintln!("failed to init logging: {err}");
			}

			err
		})
		.context("failed to parse config")?;

	logging::init(&config.logging().level, config.logging().mode).context("failed to init logging")?;

	tracing::info!(name = config.name(), "starting up");

	let global = Arc::new(G::new(ctx, config).await.context("failed to create global state")?);

	tracing::debug!("global state created, starting process");

	let process_future = tokio::spawn(process(global));

	let mut signal_handler = signal::SignalHandler::new()
		.with_signal(SignalKind::interrupt())
		.with_signal(SignalKind::terminate());

	select! {
		_ = signal_handler.recv() => tracing::info!("shutting down"),
		r = process_future => match r {
			Ok(Ok(())) => tracing::error!("process stopped unexpectedly: no error raised"),
			Ok(Err(err)) => tracing::error!("process stopped unexpectedly: {err:#}"),
			Err(err) => tracing::error!("process stopped unexpectedly: {err:#}"),
		},
	}

	tracing::info!("waiting for tasks to finish");

	select! {
		_ = time::sleep(Duration::from_secs(60)) => tracing::warn!("force shutting down"),
		_ = signal_handler.recv() => tracing::warn!("force shutting down"),
		_ = handler.cancel() => tracing::info!("shutting down"),
	}

	Ok(())
}
