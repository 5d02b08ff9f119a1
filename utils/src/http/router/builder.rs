use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::middleware::{Middleware, NextFn, NextFut};
use super::{ErrorHandler, RouteHandler, Router};

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Copy)]
enum MiddlewareKind {
	Data,
	Generic,
}

pub struct RouterBuilder<I, O, E> {
	routes: Vec<(hyper::Method, &'static str, RouteHandler<I, O, E>)>,
	middlewares: Vec<(Arc<dyn Middleware<I, O, E>>, MiddlewareKind)>,
	error_handler: Option<ErrorHandler<O, E>>,
	not_found: Option<RouteHandler<I, O, E>>,
}

impl<I, O, E> Debug for RouterBuilder<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouterBuilder")
			.field(
				"routes",
				&self.routes.iter().map(|(method, path, _)| (method, path)).collect::<Vec<_>>(),
			)
			.finish()
	}
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> Default for RouterBuilder<I, O, E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> RouterBuilder<I, O, E> {
	pub fn new() -> Self {
		Self {
			routes: Vec::new(),
			middlewares: Vec::new(),
			error_handler: None,
			not_found: None,
		}
	}

	/// Middlewares run in registration order, after every `data` injection.
	pub fn middleware(mut self, middleware: impl Middleware<I, O, E> + 'static) -> Self {
		self.middlewares.push((Arc::new(middleware), MiddlewareKind::Generic));
		self
	}

	/// Inserts a clone of `data` into the extensions of every request.
	pub fn data<T: Clone + Send + Sync + 'static>(mut self, data: T) -> Self {
		self.middlewares.push((
			Arc::new(move |mut req: hyper::Request<I>, next: NextFn<I, O, E>| {
				req.extensions_mut().insert(data.clone());
				next(req)
			}),
			MiddlewareKind::Data,
		));

		self
	}

	/// Renders errors returned by handlers and middlewares into responses.
	pub fn error_handler<F: Future<Output = hyper::Response<O>> + Send + 'static>(
		mut self,
		handler: impl Fn(hyper::Request<()>, E) -> F + Send + Sync + 'static,
	) -> Self {
		self.error_handler = Some(Arc::new(move |req, err| {
			Box::pin(handler(req, err)) as Pin<Box<dyn Future<Output = hyper::Response<O>> + Send + 'static>>
		}));
		self
	}

	pub fn post<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		self,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.add_route(hyper::Method::POST, path, handler)
	}

	pub fn add_route<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		mut self,
		method: hyper::Method,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.routes.push((method, path, Arc::new(move |req| Box::pin(handler(req)) as NextFut<O, E>)));
		self
	}

	/// Fallback for any request that matches no route.
	pub fn not_found<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		mut self,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.not_found = Some(Arc::new(move |req| Box::pin(handler(req)) as NextFut<O, E>));
		self
	}

	pub fn build(mut self) -> Router<I, O, E> {
		self.middlewares.sort_by_key(|(_, kind)| *kind);

		let mut router = Router {
			routes: Vec::with_capacity(self.routes.len()),
			middlewares: self.middlewares.into_iter().map(|(middleware, _)| middleware).collect(),
			error_handler: self.error_handler,
			not_found: self.not_found,
			tree: path_tree::PathTree::new(),
		};

		for (method, path, handler) in self.routes {
			router.routes.push(handler);

			let full_path = format!("/{}/{}", method.as_str(), path.trim_matches('/'));

			tracing::debug!(full_path, "adding route");

			let _ = router.tree.insert(&full_path, router.routes.len() - 1);
		}

		router
	}
}
