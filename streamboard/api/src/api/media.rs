use std::sync::Arc;

use binary_helper::global::RequestGlobalExt;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{header, Request, Response, StatusCode};
use utils::http::ext::{OptionExt, ResultExt};
use utils::http::router::builder::RouterBuilder;
use utils::http::router::ext::RequestExt;
use utils::http::router::Router;
use utils::http::RouteError;

use super::error::{ApiError, Result};
use super::Body;
use crate::global::ApiGlobal;

pub fn routes<G: ApiGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder().get("/:key+", serve::<G>)
}

async fn serve<G: ApiGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = req.get_global::<G, _>()?;
	let key = req
		.param("key")
		.map(str::to_owned)
		.map_err_route((StatusCode::NOT_FOUND, "Not found."))?;

	let blob = global.blobs().read(&key).await?;

	Response::builder()
		.status(StatusCode::OK)
		.header(header::CONTENT_TYPE, blob.content_type)
		.header(header::CACHE_CONTROL, "public, max-age=86400")
		.body(Full::new(blob.data))
		.map_ignore_err_route("failed to build response")
}
