use std::sync::Arc;

use hyper::StatusCode;
use utils::http::RouteError;

use super::error::ApiError;
use super::jwt::{AuthJwtPayload, JwtState, TokenKind};
use crate::database::User;
use crate::global::ApiGlobal;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
	#[error("token must be ascii only")]
	HeaderToStr,
	#[error("token must be a bearer token")]
	NotBearerToken,
	#[error("not logged in")]
	NotLoggedIn,
	#[error("invalid token")]
	InvalidToken,
	#[error("failed to fetch user")]
	FetchUser,
	#[error("user not found")]
	UserNotFound,
}

impl From<AuthError> for RouteError<ApiError> {
	fn from(value: AuthError) -> Self {
		RouteError::from(match &value {
			AuthError::HeaderToStr => (StatusCode::UNAUTHORIZED, "token must be ascii only"),
			AuthError::NotBearerToken => (StatusCode::UNAUTHORIZED, "token must be a bearer token"),
			AuthError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "Authentication credentials were not provided."),
			AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Given token not valid for any token type"),
			AuthError::FetchUser => (StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch user"),
			AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "User not found"),
		})
		.with_source(Some(ApiError::Auth(value)))
	}
}

#[derive(Debug, Clone)]
pub struct AuthData {
	pub user: User,
}

impl AuthData {
	pub async fn from_user_id<G: ApiGlobal>(global: &Arc<G>, user_id: ulid::Ulid) -> Result<Self, AuthError> {
		let user = global
			.users()
			.by_id(user_id)
			.await
			.map_err(|err| {
				tracing::error!(error = %err, "failed to fetch user");
				AuthError::FetchUser
			})?
			.ok_or(AuthError::UserNotFound)?;

		Ok(Self { user })
	}

	/// Resolves an access token into the user it was issued to.
	pub async fn from_access_token<G: ApiGlobal>(global: &Arc<G>, token: &str) -> Result<Self, AuthError> {
		let jwt = AuthJwtPayload::verify(global, token)
			.filter(|jwt| jwt.kind == TokenKind::Access)
			.ok_or(AuthError::InvalidToken)?;

		Self::from_user_id(global, jwt.user_id).await
	}
}
