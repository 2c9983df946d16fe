//! Error types for pgcrud

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pgcrud operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Invalid call shape (empty column list, missing parameters, bad settings).
    ///
    /// Always detected before any connection is checked out.
    #[error("Config error: {0}")]
    Config(String),

    /// Pool construction, dial/handshake or version probe failure at startup
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement rejected by the server, or the round trip failed
    #[error("Query error: {cause}; sql: {sql:?}; params: {params:?}")]
    Query {
        /// SQL text that was sent
        sql: String,
        /// `Debug` rendering of every bound parameter, in order
        params: Vec<String>,
        /// Underlying failure
        #[source]
        cause: QueryCause,
    },

    /// The query ran but a result row could not be decoded
    #[error("Scan error: {0}")]
    Scan(String),
}

/// Why a round trip failed.
#[derive(Debug, Error)]
pub enum QueryCause {
    /// Error reported by the driver or the server
    #[error("{0}")]
    Db(#[from] tokio_postgres::Error),

    /// No connection could be checked out of the pool
    #[error("pool: {0}")]
    Pool(String),

    /// The caller's cancel signal fired while the call was in flight
    #[error("cancelled")]
    Cancelled,

    /// The call exceeded its deadline
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a scan error
    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    pub fn is_scan(&self) -> bool {
        matches!(self, Self::Scan(_))
    }

    /// The failure cause, if this is a query error
    pub fn query_cause(&self) -> Option<&QueryCause> {
        match self {
            Self::Query { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Check if the call was aborted through its cancel signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self.query_cause(), Some(QueryCause::Cancelled))
    }

    /// Check if the call exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self.query_cause(), Some(QueryCause::Timeout(_)))
    }

    /// SQLSTATE code reported by the server, if any
    pub fn sql_state(&self) -> Option<&str> {
        match self.query_cause() {
            Some(QueryCause::Db(err)) => err.as_db_error().map(|db| db.code().code()),
            _ => None,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.sql_state() == Some("23505")
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sql_state() == Some("23503")
    }
}
