use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use super::middleware::{Middleware, Provide, Recover};
use super::{RouteEntry, RouteHandler, Router, ANY_METHOD};

/// Data middlewares run first so error handlers and generic middlewares can
/// read what they provide.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Copy)]
enum MiddlewareKind {
	Data,
	Error,
	Generic,
}

/// A route or a nested scope, registered under a path relative to the
/// builder holding it.
enum Entry<I, O, E> {
	Route {
		/// `None` matches every method.
		method: Option<hyper::Method>,
		handler: RouteHandler<I, O, E>,
	},
	Scope(RouterBuilder<I, O, E>),
}

impl<I, O, E> Debug for Entry<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Entry::Route { method, .. } => f.debug_struct("Route").field("method", method).finish(),
			Entry::Scope(builder) => f.debug_tuple("Scope").field(builder).finish(),
		}
	}
}

pub struct RouterBuilder<I, O, E> {
	entries: Vec<(&'static str, Entry<I, O, E>)>,
	middlewares: Vec<(Arc<dyn Middleware<I, O, E>>, MiddlewareKind)>,
}

impl<I, O, E> Debug for RouterBuilder<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouterBuilder").field("entries", &self.entries).finish()
	}
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> Default for RouterBuilder<I, O, E> {
	fn default() -> Self {
		Self::new()
	}
}

macro_rules! method_routes {
	($($name:ident => $method:ident),* $(,)?) => {
		$(
			pub fn $name<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
				self,
				path: &'static str,
				handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
			) -> Self {
				self.add_route(Some(hyper::Method::$method), path, handler)
			}
		)*
	};
}

fn join_path(parent: &str, path: &str) -> String {
	let parent = parent.trim_matches('/');
	let path = path.trim_matches('/');

	match (parent.is_empty(), path.is_empty()) {
		(true, _) => path.to_owned(),
		(_, true) => parent.to_owned(),
		_ => format!("{parent}/{path}"),
	}
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> RouterBuilder<I, O, E> {
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
			middlewares: Vec::new(),
		}
	}

	pub fn middleware(self, middleware: impl Middleware<I, O, E> + 'static) -> Self {
		let mut builder = middleware.extend(self);
		builder.middlewares.push((Arc::new(middleware), MiddlewareKind::Generic));
		builder
	}

	/// Inserts a clone of `data` into the extensions of every request routed
	/// through this scope.
	pub fn data<T: Clone + Send + Sync + 'static>(mut self, data: T) -> Self {
		self.middlewares.push((Arc::new(Provide(data)), MiddlewareKind::Data));
		self
	}

	pub fn error_handler<F: Future<Output = hyper::Response<O>> + Send + 'static>(
		mut self,
		handler: impl Fn(hyper::Request<()>, E) -> F + Send + Sync + 'static,
	) -> Self {
		self.middlewares.push((Arc::new(Recover(handler)), MiddlewareKind::Error));
		self
	}

	method_routes! {
		get => GET,
		post => POST,
		put => PUT,
		patch => PATCH,
		delete => DELETE,
		options => OPTIONS,
	}

	pub fn any<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		self,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.add_route(None, path, handler)
	}

	pub fn add_route<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		mut self,
		method: Option<hyper::Method>,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.entries.push((
			path,
			Entry::Route {
				method,
				handler: Arc::new(move |req| Box::pin(handler(req))),
			},
		));
		self
	}

	pub fn scope(mut self, path: &'static str, router: RouterBuilder<I, O, E>) -> Self {
		self.entries.push((path, Entry::Scope(router)));
		self
	}

	pub fn not_found<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		self,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.add_route(None, "/*", handler)
	}

	fn build_scoped(mut self, parent_path: &str, target: &mut Router<I, O, E>, inherited: &[usize]) {
		self.middlewares.sort_by_key(|(_, kind)| *kind);

		let chain: Arc<[usize]> = inherited
			.iter()
			.copied()
			.chain(self.middlewares.into_iter().map(|(middleware, _)| {
				target.middlewares.push(middleware);
				target.middlewares.len() - 1
			}))
			.collect();

		for (path, entry) in self.entries {
			let path = join_path(parent_path, path);

			match entry {
				Entry::Route { method, handler } => {
					target.handlers.push(handler);

					let method = method.as_ref().map(hyper::Method::as_str).unwrap_or(ANY_METHOD);
					let key = format!("/{method}/{path}");

					tracing::debug!(parent_path, key, "adding route");

					let _ = target.tree.insert(
						&key,
						RouteEntry {
							handler: target.handlers.len() - 1,
							chain: chain.clone(),
						},
					);
				}
				Entry::Scope(scope) => scope.build_scoped(&path, target, &chain),
			}
		}
	}

	pub fn build(self) -> Router<I, O, E> {
		let mut router = Router {
			handlers: Vec::new(),
			middlewares: Vec::new(),
			tree: path_tree::PathTree::new(),
		};

		self.build_scoped("", &mut router, &[]);

		router
	}
}
