//! # pgcrud
//!
//! Column-list CRUD helpers for PostgreSQL.
//!
//! Give it a table, a list of columns, an optional condition and positional
//! parameters; it builds the parameterized statement, runs it on a pooled
//! connection and decodes the rows into ordered [`Record`]s.
//!
//! ## Pieces
//!
//! - [`StatementBuilder`]: pure SQL construction, one placeholder counter
//! - [`Executor`]: one round trip per call, with explicit [`Cancellation`]
//! - [`decode()`]: rows to [`Record`]s of typed [`Value`]s
//! - [`Database`]: the four operations wired together over a
//!   `deadpool-postgres` pool
//!
//! ```ignore
//! let (db, version) = pgcrud::Database::connect(&url).await?;
//! let rows = db.select(&["id", "name"], "users", "WHERE id = $1", &[&7_i64]).await?;
//! let touched = db.update("users", &["name", "tags.append"], "WHERE id = $3", &[&"ann", &"vip", &7_i64]).await?;
//! ```
//!
//! Log events are emitted through `tracing` under the `pgcrud.sql` and
//! `pgcrud` targets.

pub mod cancel;
pub mod client;
pub mod config;
pub mod database;
pub mod decode;
pub mod error;
pub mod executor;
pub mod pool;
pub mod statement;
pub mod value;

pub use cancel::{CancelHandle, Cancellation};
pub use client::{ConnectionSource, GenericClient, RowStream};
pub use config::DatabaseConfig;
pub use database::Database;
pub use decode::{ScanRow, decode};
pub use error::{DbError, DbResult, QueryCause};
pub use executor::Executor;
pub use pool::{create_pool, create_pool_from_config, create_pool_with_manager_config, create_pool_with_tls};
pub use statement::{ColumnRef, Dialect, Modifier, Placeholders, Statement, StatementBuilder, Verb};
pub use value::{Record, Value};

// Re-export driver crates used in the public API
pub use deadpool_postgres;
pub use tokio_postgres;
