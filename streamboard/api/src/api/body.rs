use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt as _, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header;
use hyper::{Request, StatusCode};
use multer::{Constraints, SizeLimit};
use serde_json::Value;
use utils::http::ext::{OptionExt, ResultExt};
use utils::http::RouteError;

use super::error::{ApiError, Result};
use crate::blob::{BlobStore, ImageFormat};
use crate::config::ApiConfig;
use crate::global::ApiGlobal;
use crate::store::{
	LayoutJson, StoreError, ValidationErrors, EMPTY_FILE, INVALID_IMAGE, NOT_A_BOOLEAN, NOT_A_FILE, NOT_A_STRING, NOT_NULL,
};

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
	pub file_name: Option<String>,
	pub content_type: Option<String>,
	pub data: Bytes,
}

#[derive(Debug, Clone)]
enum FormValue {
	Text(String),
	Json(Value),
	File(Upload),
}

/// Request fields from either a JSON object or a multipart form. The `take_*`
/// accessors convert a field and record a field error when it has the wrong
/// shape.
#[derive(Debug, Default)]
pub struct Form {
	fields: HashMap<String, FormValue>,
	errors: ValidationErrors,
}

fn too_large() -> RouteError<ApiError> {
	(StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into()
}

impl Form {
	pub async fn parse<G: ApiGlobal>(global: &Arc<G>, req: Request<Incoming>) -> Result<Self> {
		let max_size = global.config::<ApiConfig>().max_upload_size;

		let content_type = req
			.headers()
			.get(header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned)
			.map_err_route((StatusCode::UNSUPPORTED_MEDIA_TYPE, "missing content-type header"))?;

		let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

		match mime.as_str() {
			"application/json" => Self::parse_json(req, max_size).await,
			"multipart/form-data" => Self::parse_multipart(req, &content_type, max_size).await,
			_ => Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, format!("Unsupported media type \"{mime}\" in request.")).into()),
		}
	}

	async fn parse_json(req: Request<Incoming>, max_size: usize) -> Result<Self> {
		let body = match Limited::new(req.into_body(), max_size).collect().await {
			Ok(body) => body.to_bytes(),
			Err(err) if err.is::<LengthLimitError>() => return Err(too_large()),
			Err(err) => {
				return Err(
					RouteError::from((StatusCode::BAD_REQUEST, "failed to read body")).with_source(Some(ApiError::ReadBody(err)))
				);
			}
		};

		if body.is_empty() {
			return Ok(Self::default());
		}

		let value: Value = serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, "JSON parse error"))?;

		let Value::Object(object) = value else {
			return Err((StatusCode::BAD_REQUEST, "Invalid data. Expected a dictionary.").into());
		};

		Ok(Self {
			fields: object.into_iter().map(|(key, value)| (key, FormValue::Json(value))).collect(),
			errors: ValidationErrors::default(),
		})
	}

	async fn parse_multipart(req: Request<Incoming>, content_type: &str, max_size: usize) -> Result<Self> {
		let boundary = multer::parse_boundary(content_type)
			.map_ignore_err_route((StatusCode::BAD_REQUEST, "invalid content-type header"))?;

		let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_size as u64));

		let mut multipart = multer::Multipart::with_constraints(utils::http::router::compat::BodyExt::into_stream(req.into_body()), boundary, constraints);

		let mut fields = HashMap::new();

		loop {
			let field = match multipart.next_field().await {
				Ok(Some(field)) => field,
				Ok(None) => break,
				Err(multer::Error::StreamSizeExceeded { .. }) => return Err(too_large()),
				Err(err) => return Err((StatusCode::BAD_REQUEST, "invalid multipart body", err).into()),
			};

			let Some(name) = field.name().map(str::to_owned) else {
				continue;
			};

			// Browsers submit an untouched file input as a file part with an
			// empty filename, which counts as the field not being sent.
			if field.file_name() == Some("") {
				continue;
			}

			let value = if field.file_name().is_some() {
				let file_name = field.file_name().map(str::to_owned);
				let content_type = field.content_type().map(|mime| mime.to_string());
				FormValue::File(Upload {
					file_name,
					content_type,
					data: read_field(field.bytes().await)?,
				})
			} else {
				let data = read_field(field.bytes().await)?;
				match String::from_utf8(data.to_vec()) {
					Ok(text) => FormValue::Text(text),
					Err(_) => return Err((StatusCode::BAD_REQUEST, "multipart text fields must be utf-8").into()),
				}
			};

			fields.insert(name, value);
		}

		Ok(Self {
			fields,
			errors: ValidationErrors::default(),
		})
	}

	pub fn take_string(&mut self, field: &str) -> Option<String> {
		match self.fields.remove(field)? {
			FormValue::Text(text) => Some(text),
			FormValue::Json(Value::String(text)) => Some(text),
			FormValue::Json(Value::Number(number)) => Some(number.to_string()),
			FormValue::Json(Value::Bool(value)) => Some(value.to_string()),
			FormValue::Json(Value::Null) => {
				self.errors.add(field, NOT_NULL);
				None
			}
			FormValue::Json(_) | FormValue::File(_) => {
				self.errors.add(field, NOT_A_STRING);
				None
			}
		}
	}

	pub fn take_bool(&mut self, field: &str) -> Option<bool> {
		let parsed = match self.fields.remove(field)? {
			FormValue::Json(Value::Bool(value)) => Some(value),
			FormValue::Json(Value::Number(number)) => match number.as_i64() {
				Some(1) => Some(true),
				Some(0) => Some(false),
				_ => None,
			},
			FormValue::Json(Value::String(text)) | FormValue::Text(text) => parse_bool(&text),
			FormValue::Json(_) | FormValue::File(_) => None,
		};

		if parsed.is_none() {
			self.errors.add(field, NOT_A_BOOLEAN);
		}

		parsed
	}

	pub fn take_layout(&mut self, field: &str) -> Option<LayoutJson> {
		match self.fields.remove(field)? {
			FormValue::Text(text) => Some(LayoutJson::Raw(text)),
			FormValue::Json(value) => Some(LayoutJson::Value(value)),
			FormValue::File(_) => {
				self.errors.add(field, NOT_A_STRING);
				None
			}
		}
	}

	/// Only accepts files that look like one of the supported image formats.
	pub fn take_image(&mut self, field: &str) -> Option<Upload> {
		match self.fields.remove(field)? {
			FormValue::File(upload) if upload.data.is_empty() => {
				self.errors.add(field, EMPTY_FILE);
				None
			}
			FormValue::File(upload) => {
				if ImageFormat::sniff(&upload.data).is_none() {
					self.errors.add(field, INVALID_IMAGE);
					return None;
				}

				Some(upload)
			}
			// Some clients clear a file field with an empty text value.
			FormValue::Text(text) if text.is_empty() => None,
			FormValue::Json(Value::Null) => None,
			FormValue::Text(_) | FormValue::Json(_) => {
				self.errors.add(field, NOT_A_FILE);
				None
			}
		}
	}

	/// Combines the errors recorded while taking fields with the outcome of
	/// validating them.
	pub fn finish<T>(self, validated: std::result::Result<T, ValidationErrors>) -> std::result::Result<T, StoreError> {
		let mut errors = self.errors;

		match validated {
			Ok(value) if errors.is_empty() => Ok(value),
			Ok(_) => Err(StoreError::Validation(errors)),
			Err(validation) => {
				errors.merge(validation);
				Err(StoreError::Validation(errors))
			}
		}
	}
}

fn read_field(data: std::result::Result<Bytes, multer::Error>) -> Result<Bytes> {
	match data {
		Ok(data) => Ok(data),
		Err(multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. }) => Err(too_large()),
		Err(err) => Err((StatusCode::BAD_REQUEST, "invalid multipart body", err).into()),
	}
}

fn parse_bool(text: &str) -> Option<bool> {
	match text.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
		"false" | "0" | "no" | "off" | "f" | "n" => Some(false),
		_ => None,
	}
}

/// Writes an upload to blob storage under `path`, returning its key.
pub async fn store_upload(blobs: &Arc<dyn BlobStore>, path: &'static str, upload: Upload) -> Result<String> {
	Ok(blobs.store(path, upload.data).await?)
}
