use std::future::Future;
use std::pin::Pin;

mod cors;

pub use cors::{CorsMiddleware, CorsOptions};

use super::builder::RouterBuilder;

pub type ResponseFuture<O, E> = Pin<Box<dyn Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>>;

/// The remainder of the chain behind a middleware, ending in the matched
/// route. Consumed by [`Next::run`].
pub struct Next<I, O, E>(Box<dyn FnOnce(hyper::Request<I>) -> ResponseFuture<O, E> + Send + Sync + 'static>);

impl<I, O, E> Next<I, O, E> {
	pub(crate) fn new(next: impl FnOnce(hyper::Request<I>) -> ResponseFuture<O, E> + Send + Sync + 'static) -> Self {
		Self(Box::new(next))
	}

	pub fn run(self, req: hyper::Request<I>) -> ResponseFuture<O, E> {
		(self.0)(req)
	}
}

#[async_trait::async_trait]
pub trait Middleware<I: Send, O: Send, E: Send>: Sync + Send + 'static {
	async fn handle(&self, req: hyper::Request<I>, next: Next<I, O, E>) -> Result<hyper::Response<O>, E>;

	/// Routes the middleware needs on the scope it is attached to, CORS uses
	/// it for preflight requests.
	fn extend(&self, builder: RouterBuilder<I, O, E>) -> RouterBuilder<I, O, E> {
		builder
	}
}

/// Pins down the closure signature so the argument types can be inferred.
pub fn middleware_fn<I: Send + 'static, O: Send + 'static, E: Send + 'static, F, Fut>(f: F) -> impl Middleware<I, O, E>
where
	F: Fn(hyper::Request<I>, Next<I, O, E>) -> Fut + Sync + Send + 'static,
	Fut: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static,
{
	f
}

#[async_trait::async_trait]
impl<I: Send + 'static, O: Send + 'static, E: Send + 'static, F, Fut> Middleware<I, O, E> for F
where
	F: Fn(hyper::Request<I>, Next<I, O, E>) -> Fut + Sync + Send + 'static,
	Fut: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static,
{
	async fn handle(&self, req: hyper::Request<I>, next: Next<I, O, E>) -> Result<hyper::Response<O>, E> {
		self(req, next).await
	}
}

/// Puts a clone of the value into the extensions of every request.
pub(crate) struct Provide<T>(pub T);

#[async_trait::async_trait]
impl<I: Send + 'static, O: Send + 'static, E: Send + 'static, T: Clone + Send + Sync + 'static> Middleware<I, O, E>
	for Provide<T>
{
	async fn handle(&self, mut req: hyper::Request<I>, next: Next<I, O, E>) -> Result<hyper::Response<O>, E> {
		req.extensions_mut().insert(self.0.clone());
		next.run(req).await
	}
}

/// Turns errors coming out of the chain into responses. The handler only
/// sees the request head, the body has been consumed by then.
pub(crate) struct Recover<F>(pub F);

#[async_trait::async_trait]
impl<I: Send + 'static, O: Send + 'static, E: Send + 'static, F, Fut> Middleware<I, O, E> for Recover<F>
where
	F: Fn(hyper::Request<()>, E) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = hyper::Response<O>> + Send + 'static,
{
	async fn handle(&self, req: hyper::Request<I>, next: Next<I, O, E>) -> Result<hyper::Response<O>, E> {
		let (parts, body) = req.into_parts();

		match next.run(hyper::Request::from_parts(parts.clone(), body)).await {
			Ok(resp) => Ok(resp),
			Err(err) => Ok((self.0)(hyper::Request::from_parts(parts, ()), err).await),
		}
	}
}
