use std::sync::Arc;

use anyhow::Context as _;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::InvalidHeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpSocket;
use tokio::select;
use utils::http::router::Router;
use utils::http::RouteError;
use utils::make_response;

use self::error::ApiError;
use crate::config::ApiConfig;
use crate::global::ApiGlobal;

pub mod auth;
pub mod body;
pub mod error;
pub mod health;
pub mod jwt;
pub mod media;
pub mod middleware;
pub mod request_context;
pub mod streamboard;
pub mod users;

pub type Body = Full<Bytes>;

pub fn routes<G: ApiGlobal>(global: &Arc<G>) -> Result<Router<Incoming, Body, RouteError<ApiError>>, InvalidHeaderValue> {
	let weak = Arc::downgrade(global);
	Ok(Router::builder()
		.data(weak)
		// Our error handler
		.error_handler(utils::http::error_handler::<ApiError, _>)
		// The CORS middleware adds the CORS headers to the response and answers preflight requests
		.middleware(middleware::cors_middleware(global)?)
		// The auth middleware checks the Authorization header, and if it's valid, it adds the user
		// to the request context. Requests without the header pass through anonymously.
		.middleware(middleware::auth::auth_middleware(global))
		.get("/health", health::health)
		.scope("/api", users::routes(global))
		.scope("/api/streamboard", streamboard::routes(global))
		.scope("/media", media::routes(global))
		.not_found(|_| async move {
			Ok(make_response!(
				hyper::StatusCode::NOT_FOUND,
				json!({
					"message": "not found",
					"success": false,
				})
			))
		})
		.build())
}

pub async fn run<G: ApiGlobal>(global: Arc<G>) -> anyhow::Result<()> {
	let config = global.config::<ApiConfig>();

	tracing::info!("Listening on {}", config.bind_address);
	let socket = if config.bind_address.is_ipv6() {
		TcpSocket::new_v6()?
	} else {
		TcpSocket::new_v4()?
	};

	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(config.bind_address)?;
	let listener = socket.listen(1024)?;

	// The router only holds a Weak reference to the global state, so keep-alive
	// connections do not keep it alive after shutdown.
	let router = Arc::new(routes(&global).context("failed to build routes")?);
	let service = service_fn(move |req| {
		let this = router.clone();
		async move { this.handle(req).await }
	});

	loop {
		select! {
			_ = global.ctx().done() => {
				return Ok(());
			},
			r = listener.accept() => {
				let (socket, addr) = r?;

				let service = service.clone();

				tracing::debug!("Accepted connection from {}", addr);

				tokio::spawn(async move {
					http1::Builder::new()
						.serve_connection(TokioIo::new(socket), service)
						.await
						.ok();
				});
			},
		}
	}
}
