//! Statement execution against a [`ConnectionSource`].
//!
//! Each call checks out one connection, performs one round trip and returns
//! the connection. There is no statement cache and no retry: a failure is
//! returned to the caller as-is.

use crate::cancel::Cancellation;
use crate::client::{ConnectionSource, GenericClient, RowStream};
use crate::decode::ScanRow;
use crate::error::{DbError, DbResult, QueryCause};
use crate::statement::Statement;
use crate::value::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Maximum SQL length (in bytes) written to log events.
const LOG_SQL_MAX: usize = 200;

/// Row type produced by a source's connections.
pub type SourceRow<S> = <<S as ConnectionSource>::Conn as GenericClient>::Row;

/// Runs built statements through a shared connection source.
#[derive(Debug, Clone)]
pub struct Executor<S> {
    source: S,
    query_timeout: Option<Duration>,
}

/// Deadline of one call, fixed when the call starts.
#[derive(Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl<S: ConnectionSource> Executor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            query_timeout: None,
        }
    }

    /// Default timeout applied to every call, in addition to the caller's
    /// own [`Cancellation`]. The earlier deadline wins.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run a select and return its rows.
    pub async fn fetch_rows(
        &self,
        statement: &Statement<'_>,
        cancel: &Cancellation,
    ) -> DbResult<RowStream<SourceRow<S>>> {
        let deadline = self.begin(statement, cancel)?;
        let conn = self.checkout(statement, cancel, deadline).await?;
        let rows = self
            .guard(
                statement,
                cancel,
                deadline,
                conn.cancel_token(),
                conn.query(statement.sql(), statement.params()),
            )
            .await?;
        Ok(RowStream::new(rows))
    }

    /// Run an update or delete and return the number of affected rows.
    pub async fn exec_write(&self, statement: &Statement<'_>, cancel: &Cancellation) -> DbResult<u64> {
        let deadline = self.begin(statement, cancel)?;
        let conn = self.checkout(statement, cancel, deadline).await?;
        self.guard(
            statement,
            cancel,
            deadline,
            conn.cancel_token(),
            conn.execute(statement.sql(), statement.params()),
        )
        .await
    }

    /// Run an `INSERT ... RETURNING key` and decode the key.
    ///
    /// The key is read from the first column of the first row and must be
    /// an integer column (`smallint`, `integer`, `bigint`).
    pub async fn exec_insert_returning_id(
        &self,
        statement: &Statement<'_>,
        cancel: &Cancellation,
    ) -> DbResult<i64> {
        let deadline = self.begin(statement, cancel)?;
        let conn = self.checkout(statement, cancel, deadline).await?;
        let rows = self
            .guard(
                statement,
                cancel,
                deadline,
                conn.cancel_token(),
                conn.query(statement.sql(), statement.params()),
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| DbError::scan("insert returned no row"))?;
        if row.width() == 0 {
            return Err(DbError::scan("insert returned a row without columns"));
        }
        match row.scan(0)? {
            Value::Int(id) => Ok(id),
            other => Err(DbError::scan(format!(
                "expected an integer key in column '{}', got {}",
                row.column_name(0),
                other.kind()
            ))),
        }
    }

    fn begin(&self, statement: &Statement<'_>, cancel: &Cancellation) -> DbResult<Option<Deadline>> {
        tracing::debug!(
            target: "pgcrud.sql",
            verb = %statement.verb(),
            param_count = statement.params().len(),
            sql = %truncate_sql(statement.sql(), LOG_SQL_MAX)
        );

        if cancel.is_cancelled() {
            return Err(self.fail(statement, QueryCause::Cancelled));
        }
        Ok(cancel
            .effective_timeout(self.query_timeout)
            .map(|timeout| Deadline {
                at: Instant::now() + timeout,
                timeout,
            }))
    }

    async fn checkout(
        &self,
        statement: &Statement<'_>,
        cancel: &Cancellation,
        deadline: Option<Deadline>,
    ) -> DbResult<S::Conn> {
        self.guard(statement, cancel, deadline, None, self.source.checkout())
            .await
    }

    /// Race `fut` against the cancel signal and the deadline.
    async fn guard<T, F>(
        &self,
        statement: &Statement<'_>,
        cancel: &Cancellation,
        deadline: Option<Deadline>,
        cancel_token: Option<tokio_postgres::CancelToken>,
        fut: F,
    ) -> DbResult<T>
    where
        F: Future<Output = Result<T, QueryCause>>,
    {
        let expired = async {
            match deadline {
                Some(d) => {
                    tokio::time::sleep_until(d.at).await;
                    d.timeout
                }
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            result = fut => result,
            () = cancel.cancelled() => {
                cancel_on_server(cancel_token);
                Err(QueryCause::Cancelled)
            }
            timeout = expired => {
                cancel_on_server(cancel_token);
                Err(QueryCause::Timeout(timeout))
            }
        };
        result.map_err(|cause| self.fail(statement, cause))
    }

    fn fail(&self, statement: &Statement<'_>, cause: QueryCause) -> DbError {
        tracing::warn!(
            target: "pgcrud.sql",
            verb = %statement.verb(),
            error = %cause,
            sql = %truncate_sql(statement.sql(), LOG_SQL_MAX),
            "query failed"
        );
        DbError::Query {
            sql: statement.sql().to_string(),
            params: statement.rendered_params(),
            cause,
        }
    }
}

fn cancel_on_server(token: Option<tokio_postgres::CancelToken>) {
    if let Some(token) = token {
        tokio::spawn(async move {
            let _ = token.cancel_query(tokio_postgres::NoTls).await;
        });
    }
}

/// Truncate at a char boundary no later than `max` bytes.
fn truncate_sql(sql: &str, max: usize) -> &str {
    if sql.len() <= max {
        return sql;
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
