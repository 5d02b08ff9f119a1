use std::sync::Arc;

use binary_helper::global::{GlobalConfig, GlobalCtx};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use tokio::net::TcpSocket;
use tokio::select;
use utils::http::router::Router;
use utils::http::{error_body, Body, RouteError};
use utils::make_response;

use self::error::{ApiError, BoxError};
use crate::config::ApiConfig;
use crate::global::ApiGlobal;

mod body;
pub mod error;
mod log;
pub(crate) mod middleware;
mod promotions;
mod validate;

pub const INTERNAL_ERROR: &str = "An internal error occurred";

pub fn routes<G: ApiGlobal, B>(global: &Arc<G>) -> Router<B, Body, RouteError<ApiError>>
where
	B: hyper::body::Body<Data = Bytes> + Send + 'static,
	B::Error: Into<BoxError>,
{
	let weak = Arc::downgrade(global);
	Router::builder()
		.data(weak)
		.middleware(middleware::request_logging())
		.middleware(middleware::catch_panic())
		.post("/validate", validate::handle::<G, B>)
		.post("/promotions", promotions::handle::<G, B>)
		.post("/log", log::handle::<G, B>)
		.error_handler(utils::http::error_handler::<ApiError>)
		.not_found(|_| async move { Ok(make_response!(StatusCode::NOT_FOUND, error_body("Not found"))) })
		.build()
}

pub async fn run<G: ApiGlobal>(global: Arc<G>) -> anyhow::Result<()> {
	let config = global.config::<ApiConfig>();

	tracing::info!("listening on {}", config.bind_address);
	let socket = if config.bind_address.is_ipv6() {
		TcpSocket::new_v6()?
	} else {
		TcpSocket::new_v4()?
	};

	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(config.bind_address)?;
	let listener = socket.listen(1024)?;

	// The router only holds a Weak to the global state, so open keep-alive
	// connections do not keep it alive during shutdown.
	let router = Arc::new(routes::<G, Incoming>(&global));
	let service = service_fn(move |req| {
		let this = router.clone();
		async move { this.handle(req).await }
	});

	loop {
		select! {
			_ = global.ctx().done() => {
				return Ok(());
			},
			r = listener.accept() => {
				let (socket, addr) = r?;

				let service = service.clone();

				tracing::debug!("accepted connection from {}", addr);

				tokio::spawn(async move {
					if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(socket), service).await {
						tracing::debug!(error = %err, "connection closed with error");
					}
				});
			},
		}
	}
}
