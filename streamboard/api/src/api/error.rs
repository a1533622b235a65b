use bytes::Bytes;
use hyper::StatusCode;
use serde_json::json;
use utils::http::RouteError;
use utils::make_response;

use super::auth::AuthError;
use crate::blob::BlobError;
use crate::store::StoreError;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("failed to read http body: {0}")]
	ReadBody(Box<dyn std::error::Error + Send + Sync>),
	#[error("failed to parse multipart body: {0}")]
	Multipart(#[from] multer::Error),
	#[error("failed to parse json body: {0}")]
	Json(#[from] serde_json::Error),
	#[error("store: {0}")]
	Store(#[from] StoreError),
	#[error("blob: {0}")]
	Blob(#[from] BlobError),
	#[error("auth: {0}")]
	Auth(#[from] AuthError),
}

impl From<StoreError> for RouteError<ApiError> {
	fn from(err: StoreError) -> Self {
		let route_error: RouteError<ApiError> = match &err {
			StoreError::Validation(errors) => {
				let resp: hyper::Response<Bytes> = make_response!(
					StatusCode::BAD_REQUEST,
					json!({
						"message": "validation failed",
						"success": false,
						"errors": errors,
					})
				);
				resp.into()
			}
			StoreError::Detail(detail) => {
				let resp: hyper::Response<Bytes> = make_response!(StatusCode::BAD_REQUEST, json!({ "detail": detail }));
				resp.into()
			}
			StoreError::NotFound => (StatusCode::NOT_FOUND, "Not found.").into(),
			StoreError::Repository(_) | StoreError::Hash(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into()
			}
		};

		route_error.with_source(Some(ApiError::Store(err)))
	}
}

impl From<BlobError> for RouteError<ApiError> {
	fn from(err: BlobError) -> Self {
		let route_error: RouteError<ApiError> = match &err {
			BlobError::NotAnImage => {
				let resp: hyper::Response<Bytes> = make_response!(
					StatusCode::BAD_REQUEST,
					json!({
						"message": "validation failed",
						"success": false,
						"errors": { "file": [crate::store::INVALID_IMAGE] },
					})
				);
				resp.into()
			}
			BlobError::InvalidKey(_) | BlobError::NotFound => (StatusCode::NOT_FOUND, "Not found.").into(),
			BlobError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "failed to access media").into(),
		};

		route_error.with_source(Some(ApiError::Blob(err)))
	}
}
