use std::sync::Arc;

use binary_helper::global::RequestGlobalExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use utils::http::ext::OptionExt;
use utils::http::router::builder::RouterBuilder;
use utils::http::router::Router;
use utils::http::RouteError;
use utils::make_response;

use super::body::{store_upload, Form, Upload};
use super::error::{ApiError, Result};
use super::jwt::{AuthJwtPayload, JwtState, TokenKind};
use super::request_context::RequestContext;
use super::Body;
use crate::blob::PROFILE_PICTURE_PATH;
use crate::config::JwtConfig;
use crate::database::User;
use crate::global::ApiGlobal;
use crate::store::{UserFields, ValidationErrors, REQUIRED};

pub fn routes<G: ApiGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.post("/signup", signup::<G>)
		.post("/login", login::<G>)
		.post("/token/refresh", refresh::<G>)
		.get("/profile", profile::<G>)
		.put("/profile/update", update_profile::<G>)
		.patch("/profile/update", update_profile::<G>)
		.put("/password/change", change_password::<G>)
		.patch("/password/change", change_password::<G>)
}

/// The public representation of a user, the password hash never leaves the
/// server.
pub fn user_json<G: ApiGlobal>(global: &Arc<G>, user: &User) -> Value {
	json!({
		"id": user.id,
		"username": user.username,
		"email": user.email,
		"first_name": user.first_name,
		"last_name": user.last_name,
		"profile_picture": user.profile_picture.as_deref().map(|key| global.blobs().url(key)),
		"is_dark": user.is_dark,
	})
}

fn take_user_fields(form: &mut Form) -> UserFields<Upload> {
	UserFields {
		username: form.take_string("username"),
		password: form.take_string("password"),
		email: form.take_string("email"),
		first_name: form.take_string("first_name"),
		last_name: form.take_string("last_name"),
		is_dark: form.take_bool("is_dark"),
		profile_picture: form.take_image("profile_picture"),
	}
}

fn sign<G: ApiGlobal>(global: &Arc<G>, user: &User, kind: TokenKind) -> Result<String> {
	AuthJwtPayload::new(global.config::<JwtConfig>(), user.id, kind)
		.serialize(global)
		.map_err_route((StatusCode::INTERNAL_SERVER_ERROR, "failed to sign token"))
}

async fn signup<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;

	let mut form = Form::parse(&global, req).await?;
	let fields = take_user_fields(&mut form);
	let fields = form.finish(fields.validate_signup())?;

	let blobs = global.blobs();
	let fields = fields
		.try_map_image(|upload| store_upload(blobs, PROFILE_PICTURE_PATH, upload))
		.await?;

	let user = global.users().insert(fields).await?;

	tracing::info!(id = %user.id, username = %user.username, "user signed up");

	Ok(make_response!(StatusCode::CREATED, user_json(&global, &user)))
}

async fn login<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;

	let mut form = Form::parse(&global, req).await?;
	let username = form.take_string("username");
	let password = form.take_string("password");

	let credentials = match (username, password) {
		(Some(username), Some(password)) => Ok((username, password)),
		(username, password) => {
			let mut errors = ValidationErrors::default();
			if username.is_none() {
				errors.add("username", REQUIRED);
			}
			if password.is_none() {
				errors.add("password", REQUIRED);
			}
			Err(errors)
		}
	};
	let (username, password) = form.finish(credentials)?;

	let user = global
		.users()
		.authenticate(&username, &password)
		.await?
		.map_err_route((StatusCode::UNAUTHORIZED, "No active account found with the given credentials"))?;

	Ok(make_response!(
		StatusCode::OK,
		json!({
			"access": sign(&global, &user, TokenKind::Access)?,
			"refresh": sign(&global, &user, TokenKind::Refresh)?,
		})
	))
}

async fn refresh<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;

	let mut form = Form::parse(&global, req).await?;
	let token = form.take_string("refresh");
	let token = form.finish(match token {
		Some(token) => Ok(token),
		None => Err(ValidationErrors::single("refresh", REQUIRED)),
	})?;

	let jwt = AuthJwtPayload::verify(&global, &token)
		.filter(|jwt| jwt.kind == TokenKind::Refresh)
		.map_err_route((StatusCode::UNAUTHORIZED, "Token is invalid or expired"))?;

	let user = global
		.users()
		.by_id(jwt.user_id)
		.await?
		.map_err_route((StatusCode::UNAUTHORIZED, "Token is invalid or expired"))?;

	Ok(make_response!(
		StatusCode::OK,
		json!({
			"access": sign(&global, &user, TokenKind::Access)?,
		})
	))
}

async fn profile<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	Ok(make_response!(StatusCode::OK, user_json(&global, &auth.user)))
}

async fn update_profile<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	let mut form = Form::parse(&global, req).await?;
	let fields = take_user_fields(&mut form);
	let fields = form.finish(fields.validate_update())?;

	let blobs = global.blobs();
	let fields = fields
		.try_map_image(|upload| store_upload(blobs, PROFILE_PICTURE_PATH, upload))
		.await?;

	let user = global.users().apply(&auth.user, fields).await?;

	Ok(make_response!(StatusCode::OK, user_json(&global, &user)))
}

async fn change_password<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	let mut form = Form::parse(&global, req).await?;
	let current_password = form.take_string("current_password");
	let new_password = form.take_string("new_password");
	form.finish(Ok(()))?;

	let user = global
		.users()
		.change_password(&auth.user, current_password.as_deref(), new_password.as_deref())
		.await?;

	tracing::info!(id = %user.id, "password changed");

	Ok(make_response!(
		StatusCode::OK,
		json!({
			"detail": "Password updated successfully."
		})
	))
}
