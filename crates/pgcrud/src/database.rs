//! The public CRUD surface: build, execute and decode in one call.
//!
//! # Example
//!
//! ```ignore
//! use pgcrud::Database;
//!
//! let (db, version) = Database::connect("postgres://postgres@localhost/app").await?;
//! println!("connected to {version}");
//!
//! let id = db
//!     .insert("users", &["username", "email"], "id", &[&"alice", &"alice@example.com"])
//!     .await?;
//! let users = db
//!     .select(&["id", "username AS name"], "users", "WHERE id = $1", &[&id])
//!     .await?;
//! db.update("users", &["tags.append"], "WHERE id = $2", &[&"admin", &id]).await?;
//! db.delete("users", &["id"], &[&id]).await?;
//! db.close();
//! ```

use crate::cancel::Cancellation;
use crate::client::{ConnectionSource, GenericClient};
use crate::config::DatabaseConfig;
use crate::decode::{ScanRow, decode};
use crate::error::{DbError, DbResult};
use crate::executor::Executor;
use crate::pool::create_pool_from_config;
use crate::statement::{ColumnRef, Statement, StatementBuilder, Verb};
use crate::value::{Record, Value};
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;

/// Pooled database handle.
///
/// Cheap to share by reference across tasks; every call checks out its own
/// connection.
#[derive(Debug, Clone)]
pub struct Database<S = Pool> {
    builder: StatementBuilder,
    executor: Executor<S>,
}

impl Database<Pool> {
    /// Connect with default settings and probe the server version.
    pub async fn connect(database_url: &str) -> DbResult<(Self, String)> {
        Self::connect_with(DatabaseConfig::new(database_url)).await
    }

    /// Build the pool from `config`, open a first connection and probe the
    /// server version. The pool is closed again if the probe fails.
    pub async fn connect_with(config: DatabaseConfig) -> DbResult<(Self, String)> {
        let pool = create_pool_from_config(&config)?;
        let db = Self::from_source(pool).with_query_timeout(config.query_timeout);

        match db.server_version().await {
            Ok(version) => {
                tracing::info!(target: "pgcrud", server_version = %version, max_size = config.max_size, "connected");
                Ok((db, version))
            }
            Err(err) => {
                db.close();
                Err(err)
            }
        }
    }

    pub fn pool(&self) -> &Pool {
        self.executor.source()
    }
}

impl<S: ConnectionSource> Database<S> {
    /// Wrap any connection source.
    pub fn from_source(source: S) -> Self {
        Self {
            builder: StatementBuilder::postgres(),
            executor: Executor::new(source),
        }
    }

    /// Default timeout for every call.
    pub fn with_query_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.executor = self.executor.with_query_timeout(timeout);
        self
    }

    pub fn executor(&self) -> &Executor<S> {
        &self.executor
    }

    /// Release the pool. Safe to call more than once.
    pub fn close(&self) {
        tracing::debug!(target: "pgcrud", "closing connection source");
        self.executor.source().close();
    }

    /// `SELECT version()`; any failure is reported as a connection error.
    pub async fn server_version(&self) -> DbResult<String> {
        let conn = self
            .executor
            .source()
            .checkout()
            .await
            .map_err(|e| DbError::Connection(format!("unable to connect to database: {e}")))?;
        let rows = conn
            .query("SELECT version()", &[])
            .await
            .map_err(|e| DbError::Connection(format!("unable to read server version: {e}")))?;
        let version = rows
            .first()
            .filter(|row| row.width() > 0)
            .map(|row| row.scan(0))
            .transpose()
            .map_err(|e| DbError::Connection(format!("unable to read server version: {e}")))?;
        match version {
            Some(Value::Text(version)) => Ok(version),
            other => Err(DbError::Connection(format!(
                "unexpected server version result: {other:?}"
            ))),
        }
    }

    /// Select `columns` from `table`, filtered by `condition`.
    ///
    /// Records are keyed by each column's alias, or by the column text when
    /// it has none.
    pub async fn select(
        &self,
        columns: &[&str],
        table: &str,
        condition: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Record>> {
        self.select_with(&Cancellation::none(), columns, table, condition, params)
            .await
    }

    pub async fn select_with(
        &self,
        cancel: &Cancellation,
        columns: &[&str],
        table: &str,
        condition: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Vec<Record>> {
        let columns = ColumnRef::parse_all(columns)?;
        let (sql, keys) = self.builder.build_select(&columns, table, condition)?;
        let statement = Statement::new(Verb::Select, sql, params);

        let rows = self.executor.fetch_rows(&statement, cancel).await?;
        decode(rows, &keys)
    }

    /// Update `columns` of `table`. Column values come first in `params`,
    /// followed by the condition's values (`$k+1...`).
    ///
    /// A column written as `name.append` appends its value to an array
    /// column instead of overwriting it.
    pub async fn update(
        &self,
        table: &str,
        columns: &[&str],
        condition: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.update_with(&Cancellation::none(), table, columns, condition, params)
            .await
    }

    pub async fn update_with(
        &self,
        cancel: &Cancellation,
        table: &str,
        columns: &[&str],
        condition: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        let columns = ColumnRef::parse_all(columns)?;
        let sql = self
            .builder
            .build_update(&columns, table, condition, params.len())?;
        let statement = Statement::new(Verb::Update, sql, params);
        self.executor.exec_write(&statement, cancel).await
    }

    /// Insert one row and return its generated key.
    pub async fn insert(
        &self,
        table: &str,
        columns: &[&str],
        primary_key: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<i64> {
        self.insert_with(&Cancellation::none(), table, columns, primary_key, params)
            .await
    }

    pub async fn insert_with(
        &self,
        cancel: &Cancellation,
        table: &str,
        columns: &[&str],
        primary_key: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<i64> {
        let columns = ColumnRef::parse_all(columns)?;
        let sql = self.builder.build_insert(&columns, table, primary_key)?;
        require_param_count("insert", columns.len(), params.len())?;
        let statement = Statement::new(Verb::Insert, sql, params);
        self.executor.exec_insert_returning_id(&statement, cancel).await
    }

    /// Delete the rows matching every `column = value` pair.
    pub async fn delete(
        &self,
        table: &str,
        columns: &[&str],
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        self.delete_with(&Cancellation::none(), table, columns, params)
            .await
    }

    pub async fn delete_with(
        &self,
        cancel: &Cancellation,
        table: &str,
        columns: &[&str],
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<u64> {
        let columns = ColumnRef::parse_all(columns)?;
        let sql = self.builder.build_delete(&columns, table)?;
        require_param_count("delete", columns.len(), params.len())?;
        let statement = Statement::new(Verb::Delete, sql, params);
        self.executor.exec_write(&statement, cancel).await
    }
}

fn require_param_count(verb: &str, columns: usize, params: usize) -> DbResult<()> {
    if columns != params {
        return Err(DbError::config(format!(
            "{verb} of {columns} columns needs exactly {columns} parameters, got {params}"
        )));
    }
    Ok(())
}
