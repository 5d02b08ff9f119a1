mod param;
mod row;
pub mod timestamp;

pub use deadpool_postgres::Pool;
pub use param::{EncodeError, JsonParam};
pub use row::{RowMap, SqlValue};
pub use tokio_postgres::types::ToSql;
pub use {deadpool_postgres, postgres_types, tokio_postgres};

pub type Params<'a> = [&'a (dyn ToSql + Sync)];

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
	#[error("failed to acquire a database connection: {0}")]
	Connection(#[from] deadpool_postgres::PoolError),
	#[error("query failed: {0}")]
	Query(#[from] tokio_postgres::Error),
	#[error("failed to decode column {column}: {source}")]
	Decode {
		column: String,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

impl DatabaseError {
	/// Connection failures mean the database could not be reached at all, as
	/// opposed to a statement that reached it and failed.
	pub fn is_connection(&self) -> bool {
		matches!(self, Self::Connection(_))
	}
}

/// The data access seam. Every call acquires its own connection, runs one
/// statement and releases the connection before returning.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
	/// Runs a read query and returns every row as a column name to value
	/// mapping, in result order.
	async fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<RowMap>, DatabaseError>;

	/// Runs a write statement. Statements run in autocommit mode, so the
	/// change is committed when this returns. Returns the affected row count.
	async fn execute(&self, sql: &str, params: &Params<'_>) -> Result<u64, DatabaseError>;
}

pub async fn connect(pool: &Pool) -> Result<deadpool_postgres::Object, DatabaseError> {
	let client = pool.get().await.map_err(|err| {
		tracing::error!(error = %err, "database connection error");
		DatabaseError::Connection(err)
	})?;

	tracing::debug!("database connection established");

	Ok(client)
}

#[async_trait::async_trait]
impl Store for Pool {
	async fn query(&self, sql: &str, params: &Params<'_>) -> Result<Vec<RowMap>, DatabaseError> {
		let client = connect(self).await?;

		let rows = client.query(sql, params).await.map_err(|err| {
			tracing::error!(error = %err, "error executing query");
			DatabaseError::Query(err)
		})?;

		tracing::debug!(sql, rows = rows.len(), "query executed successfully");

		rows.iter().map(RowMap::from_row).collect()
	}

	async fn execute(&self, sql: &str, params: &Params<'_>) -> Result<u64, DatabaseError> {
		let client = connect(self).await?;

		let affected = client.execute(sql, params).await.map_err(|err| {
			tracing::error!(error = %err, "error executing statement");
			DatabaseError::Query(err)
		})?;

		tracing::info!(affected, "statement executed successfully");

		Ok(affected)
	}
}
