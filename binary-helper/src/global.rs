use std::io;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context as _;
use hyper::StatusCode;
use rustls::RootCertStore;
use utils::database::deadpool_postgres::{Manager, ManagerConfig, PoolConfig, RecyclingMethod, Runtime};
use utils::database::tokio_postgres::config::SslMode as PgSslMode;
use utils::database::tokio_postgres::NoTls;
use utils::database::{Pool, Store};
use utils::http::RouteError;

use crate::config::{DatabaseConfig, SslMode};

#[macro_export]
macro_rules! impl_global_traits {
	($struct:ty) => {
		impl binary_helper::global::GlobalCtx for $struct {
			#[inline(always)]
			fn ctx(&self) -> &utils::context::Context {
				&self.ctx
			}
		}

		impl binary_helper::global::GlobalDb for $struct {
			#[inline(always)]
			fn db(&self) -> &std::sync::Arc<dyn utils::database::Store> {
				&self.db
			}
		}

		impl binary_helper::global::GlobalConfig for $struct {}
	};
}

pub trait GlobalCtx {
	fn ctx(&self) -> &utils::context::Context;
}

pub trait GlobalConfig {
	#[inline(always)]
	fn config<C>(&self) -> &C
	where
		Self: GlobalConfigProvider<C>,
	{
		GlobalConfigProvider::provide_config(self)
	}
}

pub trait GlobalConfigProvider<C> {
	fn provide_config(&self) -> &C;
}

pub trait GlobalDb {
	fn db(&self) -> &Arc<dyn Store>;
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn pg_config(config: &DatabaseConfig) -> utils::database::tokio_postgres::Config {
	let mut pg_config = utils::database::tokio_postgres::Config::new();

	pg_config
		.host(&config.host)
		.dbname(&config.database)
		.user(&config.user)
		.port(config.port)
		.connect_timeout(CONNECT_TIMEOUT)
		.ssl_mode(match config.sslmode {
			SslMode::Disable => PgSslMode::Disable,
			SslMode::Prefer => PgSslMode::Prefer,
			SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
		});

	if let Some(password) = &config.password {
		pg_config.password(password);
	}

	pg_config
}

/// Builds the connection pool. No connection is opened here; the first one is
/// made when a request needs it.
pub async fn setup_database(config: &DatabaseConfig) -> anyhow::Result<Pool> {
	let pg_config = pg_config(config);

	let manager_config = ManagerConfig {
		recycling_method: RecyclingMethod::Fast,
	};

	let manager = match (config.sslmode, &config.sslrootcert) {
		(SslMode::Disable, _) => Manager::from_config(pg_config, NoTls, manager_config),
		(_, Some(root_cert)) => {
			let root_cert = tokio::fs::read(root_cert)
				.await
				.context("failed to read database root certificate")?;

			let certs = rustls_pemfile::certs(&mut io::BufReader::new(io::Cursor::new(root_cert)))
				.collect::<Result<Vec<_>, _>>()
				.context("failed to parse database root certificate")?;

			let mut cert_store = RootCertStore::empty();
			for cert in certs {
				cert_store.add(cert).context("failed to add database root certificate")?;
			}

			let tls = rustls::ClientConfig::builder()
				.with_root_certificates(cert_store)
				.with_no_client_auth();

			Manager::from_config(pg_config, tokio_postgres_rustls::MakeRustlsConnect::new(tls), manager_config)
		}
		(mode, None) => anyhow::bail!("sslmode {mode:?} requires sslrootcert"),
	};

	tracing::debug!(host = %config.host, port = config.port, database = %config.database, "database pool configured");

	Pool::builder(manager)
		.config(PoolConfig::default())
		.runtime(Runtime::Tokio1)
		.build()
		.context("failed to create database pool")
}

pub trait RequestGlobalExt<E> {
	fn get_global<G: Sync + Send + 'static>(&self) -> std::result::Result<Arc<G>, RouteError<E>>;
}

impl<E, B> RequestGlobalExt<E> for hyper::Request<B> {
	#[track_caller]
	fn get_global<G: Sync + Send + 'static>(&self) -> std::result::Result<Arc<G>, RouteError<E>> {
		self.extensions()
			.get::<Weak<G>>()
			.and_then(Weak::upgrade)
			.ok_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred").into())
	}
}
