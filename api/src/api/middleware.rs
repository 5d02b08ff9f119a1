use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;
use hyper::StatusCode;
use utils::http::router::middleware::{middleware_fn, Middleware, NextFn};
use utils::http::{error_body, Body, RouteError};
use utils::make_response;

use super::error::ApiError;
use super::INTERNAL_ERROR;

/// Logs method, path, status and latency of every request.
pub fn request_logging<B: Send + 'static>() -> impl Middleware<B, Body, RouteError<ApiError>> {
	middleware_fn(|req: hyper::Request<B>, next: NextFn<B, Body, RouteError<ApiError>>| async move {
		let method = req.method().clone();
		let path = req.uri().path().to_owned();
		let start = Instant::now();

		let res = next(req).await;

		let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
		match &res {
			Ok(res) => tracing::info!(%method, path, status = res.status().as_u16(), latency_ms, "request"),
			Err(err) => tracing::info!(%method, path, status = err.status().as_u16(), latency_ms, "request"),
		}

		res
	})
}

/// Turns a panic anywhere below this middleware into a 500 response.
pub fn catch_panic<B: Send + 'static>() -> impl Middleware<B, Body, RouteError<ApiError>> {
	middleware_fn(|req: hyper::Request<B>, next: NextFn<B, Body, RouteError<ApiError>>| async move {
		let method = req.method().clone();
		let path = req.uri().path().to_owned();

		match AssertUnwindSafe(next(req)).catch_unwind().await {
			Ok(res) => res,
			Err(panic) => {
				let message = panic
					.downcast_ref::<&str>()
					.map(|s| s.to_string())
					.or_else(|| panic.downcast_ref::<String>().cloned())
					.unwrap_or_default();

				tracing::error!(%method, path, panic = message, "request handler panicked");

				Ok(make_response!(StatusCode::INTERNAL_SERVER_ERROR, error_body(INTERNAL_ERROR)))
			}
		}
	})
}
