use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use self::builder::RouterBuilder;
use self::error::RouterError;
use self::middleware::{Middleware, NextFn, NextFut};

pub mod builder;
pub mod error;
pub mod middleware;

pub(crate) type RouteHandler<I, O, E> = Arc<dyn Fn(hyper::Request<I>) -> NextFut<O, E> + Send + Sync + 'static>;

pub(crate) type ErrorHandler<O, E> = Arc<
	dyn Fn(hyper::Request<()>, E) -> Pin<Box<dyn Future<Output = hyper::Response<O>> + Send + 'static>>
		+ Send
		+ Sync
		+ 'static,
>;

/// A method + path router. Routes are looked up in a [`path_tree::PathTree`]
/// keyed by `/{METHOD}{path}`; every middleware runs for every request,
/// including the not-found fallback.
pub struct Router<I, O, E> {
	routes: Vec<RouteHandler<I, O, E>>,
	middlewares: Vec<Arc<dyn Middleware<I, O, E>>>,
	error_handler: Option<ErrorHandler<O, E>>,
	not_found: Option<RouteHandler<I, O, E>>,
	tree: path_tree::PathTree<usize>,
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> Router<I, O, E> {
	pub fn builder() -> RouterBuilder<I, O, E> {
		RouterBuilder::new()
	}

	pub async fn handle(&self, req: hyper::Request<I>) -> Result<hyper::Response<O>, RouterError<E>> {
		let path = format!("/{}{}", req.method().as_str(), req.uri().path());

		let handler = match self.tree.find(&path) {
			Some((route, _)) => self.routes[*route].clone(),
			None => self.not_found.clone().ok_or(RouterError::NotFound)?,
		};

		let error_handler = self.error_handler.clone();

		let next = wrap_error(
			error_handler.clone(),
			Box::new(move |req| Box::pin(async move { handler(req).await }) as NextFut<O, E>),
		);

		self.middlewares
			.iter()
			.rev()
			.cloned()
			.fold(next, |next, middleware| {
				wrap_error(
					error_handler.clone(),
					Box::new(move |req| Box::pin(async move { middleware.handle(req, next).await }) as NextFut<O, E>),
				)
			})(req)
		.await
		.map_err(RouterError::Unhandled)
	}
}

/// Converts errors from `next` into responses so outer middleware always
/// observe the final response.
fn wrap_error<I: Send + 'static, O: Send + 'static, E: Send + 'static>(
	error_handler: Option<ErrorHandler<O, E>>,
	next: NextFn<I, O, E>,
) -> NextFn<I, O, E> {
	let Some(error_handler) = error_handler else {
		return next;
	};

	Box::new(move |req: hyper::Request<I>| {
		let method = req.method().clone();
		let uri = req.uri().clone();

		Box::pin(async move {
			match next(req).await {
				Ok(res) => Ok(res),
				Err(err) => {
					let mut req = hyper::Request::new(());
					*req.method_mut() = method;
					*req.uri_mut() = uri;
					Ok(error_handler(req, err).await)
				}
			}
		}) as NextFut<O, E>
	})
}

impl<I, O, E> Debug for Router<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.routes.len())
			.field("middlewares", &self.middlewares.len())
			.finish()
	}
}
