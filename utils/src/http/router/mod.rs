use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use error::RouterError;

use self::builder::RouterBuilder;
use self::middleware::{Middleware, Next, ResponseFuture};

pub mod builder;
pub mod compat;
pub mod error;
pub mod ext;
pub mod middleware;

/// Method segment used for routes registered without a method.
pub(crate) const ANY_METHOD: &str = "ANY";

pub(crate) type RouteHandler<I, O, E> = Arc<dyn Fn(hyper::Request<I>) -> ResponseFuture<O, E> + Send + Sync + 'static>;

/// Path parameters captured by the matched route, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}
}

/// What a path tree leaf points at: the handler and the middleware chain of
/// the scope it was registered in, outermost first.
#[derive(Debug)]
pub(crate) struct RouteEntry {
	pub handler: usize,
	pub chain: Arc<[usize]>,
}

/// Routes are stored in a single path tree keyed by `/{METHOD}/{path}`.
/// Trailing slashes are ignored, so `/a/b/` and `/a/b` resolve to the same
/// route.
pub struct Router<I, O, E> {
	handlers: Vec<RouteHandler<I, O, E>>,
	middlewares: Vec<Arc<dyn Middleware<I, O, E>>>,
	tree: path_tree::PathTree<RouteEntry>,
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> Router<I, O, E> {
	pub fn builder() -> RouterBuilder<I, O, E> {
		RouterBuilder::new()
	}

	fn lookup(&self, method: &str, path: &str) -> Option<(&RouteEntry, RouteParams)> {
		let key = format!("/{method}/{path}");
		let (entry, matched) = self.tree.find(&key)?;
		let params = matched.params_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();
		Some((entry, RouteParams(params)))
	}

	pub async fn handle(&self, mut req: hyper::Request<I>) -> Result<hyper::Response<O>, RouterError<E>> {
		let path = req.uri().path().trim_matches('/').to_owned();
		let (entry, params) = self
			.lookup(req.method().as_str(), &path)
			.or_else(|| self.lookup(ANY_METHOD, &path))
			.ok_or(RouterError::NotFound)?;

		req.extensions_mut().insert(params);

		let handler = self.handlers[entry.handler].clone();
		let chain = entry.chain.iter().rev().fold(Next::new(move |req| handler(req)), |next, idx| {
			let middleware = self.middlewares[*idx].clone();
			Next::new(move |req| Box::pin(async move { middleware.handle(req, next).await }) as ResponseFuture<O, E>)
		});

		chain.run(req).await.map_err(RouterError::Unhandled)
	}
}

impl<I, O, E> Debug for Router<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router").field("tree", &self.tree).finish()
	}
}
