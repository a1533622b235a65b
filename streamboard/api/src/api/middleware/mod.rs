use std::sync::Arc;

use hyper::header::InvalidHeaderValue;
use utils::http::router::middleware::{CorsMiddleware, CorsOptions};

use crate::config::ApiConfig;
use crate::global::ApiGlobal;

pub mod auth;

pub fn cors_middleware<G: ApiGlobal>(global: &Arc<G>) -> Result<CorsMiddleware, InvalidHeaderValue> {
	let config = global.config::<ApiConfig>();

	CorsMiddleware::new(&CorsOptions {
		allow_origin: config.allowed_origins.clone(),
		allow_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
			.into_iter()
			.map(String::from)
			.collect(),
		allow_headers: ["authorization", "content-type"].into_iter().map(String::from).collect(),
		expose_headers: Vec::new(),
		max_age_seconds: Some(3600),
	})
}
