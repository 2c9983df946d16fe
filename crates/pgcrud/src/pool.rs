//! Connection pool utilities

use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Create a connection pool from a database URL.
///
/// Uses `NoTls` and a pool of 16 connections. No connection is opened until
/// the first checkout.
pub fn create_pool(database_url: &str) -> DbResult<Pool> {
    create_pool_from_config(&DatabaseConfig::new(database_url))
}

/// Create a `NoTls` connection pool from a [`DatabaseConfig`].
pub fn create_pool_from_config(config: &DatabaseConfig) -> DbResult<Pool> {
    create_pool_with_tls(config, NoTls)
}

/// Create a connection pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(config: &DatabaseConfig, tls: T) -> DbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let max_size = config.max_size;
    create_pool_with_manager_config(
        &config.database_url,
        tls,
        manager_config(config.recycling.clone()),
        |builder| builder.max_size(max_size),
    )
}

/// Create a connection pool with injected `deadpool_postgres::ManagerConfig` and `PoolBuilder`.
pub fn create_pool_with_manager_config<T>(
    database_url: &str,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> DbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| {
            DbError::Connection(format!("invalid database url: {e}"))
        })?;

    let mgr = Manager::from_config(pg_config, tls, manager_config);
    configure_pool(Pool::builder(mgr))
        .build()
        .map_err(|e| DbError::Connection(format!("pool build failed: {e}")))
}

fn manager_config(recycling_method: RecyclingMethod) -> ManagerConfig {
    ManagerConfig { recycling_method }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_connection_error() {
        let err = create_pool("not a url ::").unwrap_err();
        assert!(err.is_connection(), "{err}");
        assert!(err.to_string().contains("invalid database url"), "{err}");
    }

    #[test]
    fn build_failure_is_connection_error() {
        // Timeouts need a runtime, which a bare builder does not set.
        let err = create_pool_with_manager_config(
            "postgres://u:p@localhost/app",
            NoTls,
            manager_config(RecyclingMethod::Fast),
            |builder| builder.wait_timeout(Some(std::time::Duration::from_secs(1))),
        )
        .unwrap_err();
        assert!(err.is_connection(), "{err}");
        assert!(err.to_string().contains("pool build failed"), "{err}");
    }

    #[test]
    fn pool_size_follows_config() {
        let config = DatabaseConfig::new("postgres://u:p@localhost/app")
            .max_size(3)
            .unwrap();
        let pool = create_pool_from_config(&config).unwrap();
        assert_eq!(pool.status().max_size, 3);
    }
}
