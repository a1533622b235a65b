use std::sync::Arc;

use binary_helper::global::RequestGlobalExt;
use hyper::body::Incoming;
use hyper::http::header;
use utils::http::router::ext::RequestExt;
use utils::http::router::middleware::{middleware_fn, Middleware, Next};
use utils::http::RouteError;

use crate::api::auth::{AuthData, AuthError};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::api::Body;
use crate::global::ApiGlobal;

/// Resolves the bearer token into the current user. Requests without an
/// `Authorization` header pass through anonymously, a header that does not
/// resolve to a user fails the request.
pub fn auth_middleware<G: ApiGlobal>(_: &Arc<G>) -> impl Middleware<Incoming, Body, RouteError<ApiError>> {
	middleware_fn(
		|mut req: hyper::Request<Incoming>, next: Next<Incoming, Body, RouteError<ApiError>>| async move {
			let context = RequestContext::default();
			req.provide(context.clone());

			let Some(token) = req.headers().get(header::AUTHORIZATION) else {
				// No Authorization header
				return next.run(req).await;
			};

			let token = token
				.to_str()
				.map_err(|_| AuthError::HeaderToStr)?
				.strip_prefix("Bearer ") // Tokens will start with "Bearer " so we need to remove that
				.ok_or(AuthError::NotBearerToken)?
				.to_owned();

			let global = req.get_global::<G, _>()?;

			let data = AuthData::from_access_token(&global, &token).await?;

			context.set_auth(data).await;

			next.run(req).await
		},
	)
}
