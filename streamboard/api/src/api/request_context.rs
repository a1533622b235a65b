use std::ops::Deref;
use std::sync::Arc;

use hyper::{Request, StatusCode};
use tokio::sync::RwLock;
use utils::http::ext::OptionExt;
use utils::http::router::ext::RequestExt;
use utils::http::RouteError;

use super::auth::{AuthData, AuthError};
use super::error::ApiError;

#[derive(Default, Clone)]
pub struct ContextData {
	pub auth: Option<AuthData>,
}

/// Per request state shared between the middlewares and the handler.
#[derive(Default, Clone)]
pub struct RequestContext(Arc<RwLock<ContextData>>);

impl RequestContext {
	/// The context the auth middleware attached to `req`.
	pub fn of<B>(req: &Request<B>) -> Result<Self, RouteError<ApiError>> {
		req.data::<RequestContext>()
			.cloned()
			.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "missing request context"))
	}

	pub async fn set_auth(&self, data: AuthData) {
		let mut guard = self.0.write().await;
		guard.auth = Some(data);
	}

	pub async fn auth(&self) -> Option<AuthData> {
		self.0.read().await.deref().auth.clone()
	}

	/// Like [`RequestContext::auth`] but anonymous requests are an error.
	pub async fn require_auth(&self) -> Result<AuthData, AuthError> {
		self.auth().await.ok_or(AuthError::NotLoggedIn)
	}
}
