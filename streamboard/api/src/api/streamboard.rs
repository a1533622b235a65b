use std::sync::Arc;

use binary_helper::global::RequestGlobalExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use ulid::Ulid;
use utils::http::ext::ResultExt;
use utils::http::router::builder::RouterBuilder;
use utils::http::router::ext::RequestExt;
use utils::http::router::Router;
use utils::http::RouteError;
use utils::make_response;

use super::body::{store_upload, Form};
use super::error::{ApiError, Result};
use super::request_context::RequestContext;
use super::Body;
use crate::blob::{BACKGROUND_PATH, LOGO_PATH};
use crate::database::Streamboard;
use crate::global::ApiGlobal;
use crate::store::{CreateStreamboard, StreamboardPatch, RECENT_VIEWED_LIMIT};

pub fn routes<G: ApiGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.post("/", create::<G>)
		.get("/list", list::<G>)
		.get("/latest", latest::<G>)
		.get("/recent-viewed", recent_viewed::<G>)
		.get("/:id", retrieve::<G>)
		.get("/:id/retrieve", retrieve::<G>)
		.patch("/:id", partial_update::<G>)
		.delete("/:id", delete::<G>)
}

pub fn streamboard_json<G: ApiGlobal>(global: &Arc<G>, board: &Streamboard) -> Value {
	json!({
		"id": board.id,
		"user": board.owner,
		"title": board.title,
		"background_image": global.blobs().url(&board.background_image),
		"logo": board.logo.as_deref().map(|key| global.blobs().url(key)),
		"layout_json": board.layout_json,
		"created_at": board.created_at,
		"updated_at": board.updated_at,
		"last_view": board.last_view,
	})
}

fn image_path(field: &str) -> &'static str {
	match field {
		"logo" => LOGO_PATH,
		_ => BACKGROUND_PATH,
	}
}

/// Ids that do not parse cannot belong to any streamboard.
fn streamboard_id<B>(req: &Request<B>) -> Result<Ulid> {
	req.param("id")
		.map(Ulid::from_string)
		.unwrap_or(Ok(Ulid::nil()))
		.map_ignore_err_route((StatusCode::NOT_FOUND, "Not found."))
}

async fn create<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	let mut form = Form::parse(&global, req).await?;
	let input = CreateStreamboard {
		title: form.take_string("title"),
		layout_json: form.take_layout("layout_json"),
		background_image: form.take_image("background_image"),
		logo: form.take_image("logo"),
	};
	let input = form.finish(input.validate())?;

	let blobs = global.blobs();
	let input = input
		.try_map_images(|upload, field| store_upload(blobs, image_path(field), upload))
		.await?;

	let board = global.streamboards().insert(auth.user.id, input).await?;

	Ok(make_response!(StatusCode::CREATED, streamboard_json(&global, &board)))
}

async fn list<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	let boards = global.streamboards().list(auth.user.id).await?;

	Ok(make_response!(
		StatusCode::OK,
		Value::Array(boards.iter().map(|board| streamboard_json(&global, board)).collect())
	))
}

async fn latest<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	match global.streamboards().get_latest(auth.user.id).await? {
		Some(board) => Ok(make_response!(StatusCode::OK, streamboard_json(&global, &board))),
		None => {
			let mut resp = Response::new(Body::default());
			*resp.status_mut() = StatusCode::NO_CONTENT;
			Ok(resp)
		}
	}
}

async fn recent_viewed<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;

	let boards = global
		.streamboards()
		.list_recent_viewed(auth.user.id, RECENT_VIEWED_LIMIT)
		.await?;

	Ok(make_response!(
		StatusCode::OK,
		Value::Array(boards.iter().map(|board| streamboard_json(&global, board)).collect())
	))
}

async fn retrieve<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;
	let id = streamboard_id(&req)?;

	let board = global.streamboards().retrieve(auth.user.id, id).await?;

	Ok(make_response!(StatusCode::OK, streamboard_json(&global, &board)))
}

async fn partial_update<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;
	let id = streamboard_id(&req)?;

	let mut form = Form::parse(&global, req).await?;
	let patch = StreamboardPatch {
		title: form.take_string("title"),
		layout_json: form.take_layout("layout_json"),
		background_image: form.take_image("background_image"),
		logo: form.take_image("logo"),
	};
	let changes = form.finish(patch.validate())?;

	// Nothing gets uploaded for a streamboard the user cannot see.
	global.streamboards().get(auth.user.id, id).await?;

	let blobs = global.blobs();
	let changes = changes
		.try_map_images(|upload, field| store_upload(blobs, image_path(field), upload))
		.await?;

	let board = global.streamboards().apply(auth.user.id, id, changes).await?;

	Ok(make_response!(StatusCode::OK, streamboard_json(&global, &board)))
}

async fn delete<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let auth = RequestContext::of(&req)?.require_auth().await?;
	let id = streamboard_id(&req)?;

	global.streamboards().delete(auth.user.id, id).await?;

	let mut resp = Response::new(Body::default());
	*resp.status_mut() = StatusCode::NO_CONTENT;
	Ok(resp)
}
