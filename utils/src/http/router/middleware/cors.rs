use http::header::{self, HeaderValue, InvalidHeaderValue};

use super::{Middleware, Next};
use crate::http::router::builder::RouterBuilder;

#[derive(Debug, Clone, Default)]
pub struct CorsOptions {
	/// Origins allowed to read responses, `*` allows any origin.
	pub allow_origin: Vec<String>,
	pub allow_methods: Vec<String>,
	pub allow_headers: Vec<String>,
	pub expose_headers: Vec<String>,
	pub max_age_seconds: Option<u64>,
}

impl CorsOptions {
	pub fn wildcard() -> Self {
		Self {
			allow_origin: vec!["*".to_owned()],
			allow_methods: vec!["*".to_owned()],
			allow_headers: vec!["*".to_owned()],
			expose_headers: vec!["*".to_owned()],
			max_age_seconds: Some(3600),
		}
	}
}

pub struct CorsMiddleware {
	allow_origins: fnv::FnvHashSet<String>,
	allow_methods: HeaderValue,
	allow_headers: HeaderValue,
	expose_headers: HeaderValue,
	max_age: Option<HeaderValue>,
}

impl CorsMiddleware {
	pub fn new(options: &CorsOptions) -> Result<Self, InvalidHeaderValue> {
		Ok(Self {
			allow_origins: options.allow_origin.iter().map(|s| s.to_lowercase()).collect(),
			allow_methods: HeaderValue::from_str(&options.allow_methods.join(", "))?,
			allow_headers: HeaderValue::from_str(&options.allow_headers.join(", "))?,
			expose_headers: HeaderValue::from_str(&options.expose_headers.join(", "))?,
			max_age: options.max_age_seconds.map(HeaderValue::from),
		})
	}

	fn allows(&self, origin: &HeaderValue) -> bool {
		if self.allow_origins.contains("*") {
			return true;
		}

		origin
			.to_str()
			.map(|origin| self.allow_origins.contains(&origin.to_lowercase()))
			.unwrap_or(false)
	}
}

#[async_trait::async_trait]
impl<I: Send + 'static, O: Default + Send + 'static, E: Send + 'static> Middleware<I, O, E> for CorsMiddleware {
	async fn handle(&self, req: hyper::Request<I>, next: Next<I, O, E>) -> Result<hyper::Response<O>, E> {
		let origin = req.headers().get(header::ORIGIN).cloned();

		let mut resp = next.run(req).await?;

		let Some(origin) = origin.filter(|origin| self.allows(origin)) else {
			return Ok(resp);
		};

		let headers = resp.headers_mut();
		headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);

		if !self.allow_methods.is_empty() {
			headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
		}

		if !self.allow_headers.is_empty() {
			headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
		}

		if !self.expose_headers.is_empty() {
			headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, self.expose_headers.clone());
		}

		if let Some(max_age) = self.max_age.clone() {
			headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age);
		}

		headers.insert(header::VARY, HeaderValue::from_static("Origin"));

		Ok(resp)
	}

	fn extend(&self, builder: RouterBuilder<I, O, E>) -> RouterBuilder<I, O, E> {
		builder.options("/*", |_| async move {
			let mut resp = hyper::Response::new(O::default());
			*resp.status_mut() = hyper::StatusCode::NO_CONTENT;
			Ok(resp)
		})
	}
}
