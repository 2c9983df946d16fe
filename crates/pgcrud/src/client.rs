//! Connection seams: a client that runs SQL and a source that lends clients.

use crate::decode::ScanRow;
use crate::error::QueryCause;
use std::future::Future;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction`
/// and pooled `deadpool_postgres::Client`s.
pub trait GenericClient: Send + Sync {
    /// Row type produced by this client.
    type Row: ScanRow + Send;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Self::Row>, QueryCause>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, QueryCause>> + Send;

    /// Return a cancellation token for the underlying connection, if supported.
    ///
    /// Used to send a best-effort server-side cancel when a call is aborted.
    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        None
    }
}

impl GenericClient for tokio_postgres::Client {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, QueryCause> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, QueryCause> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, QueryCause> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, QueryCause> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Transaction::cancel_token(self))
    }
}

// ===== deadpool-postgres support =====

impl GenericClient for deadpool_postgres::Client {
    type Row = Row;

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, QueryCause> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        GenericClient::query(client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, QueryCause> {
        let client: &tokio_postgres::Client = self;
        GenericClient::execute(client, sql, params).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        let client: &tokio_postgres::Client = self;
        GenericClient::cancel_token(client)
    }
}

/// Lends a connection for the duration of one call.
///
/// The pool is the only shared state; implementations must be safe to use
/// from many tasks at once.
pub trait ConnectionSource: Send + Sync {
    type Conn: GenericClient;

    /// Check out a connection. It returns to the source when dropped.
    fn checkout(&self) -> impl Future<Output = Result<Self::Conn, QueryCause>> + Send;

    /// Release the source. Must be idempotent.
    fn close(&self) {}
}

impl ConnectionSource for deadpool_postgres::Pool {
    type Conn = deadpool_postgres::Client;

    async fn checkout(&self) -> Result<Self::Conn, QueryCause> {
        self.get()
            .await
            .map_err(|e| QueryCause::Pool(e.to_string()))
    }

    fn close(&self) {
        deadpool_postgres::Pool::close(self);
    }
}

/// Rows returned by one select round trip, in server order.
#[must_use]
#[derive(Debug)]
pub struct RowStream<R> {
    rows: std::vec::IntoIter<R>,
}

impl<R> RowStream<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl<R> Iterator for RowStream<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<R> ExactSizeIterator for RowStream<R> {}
