//! Connection pool construction for [`PgExecutor`](crate::PgExecutor).

use crate::error::{OrmError, OrmResult};
use crate::executor::PgExecutor;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::NoTls;

const DEFAULT_MAX_SIZE: usize = 16;

/// Create a plaintext connection pool from a database URL.
///
/// ```ignore
/// let pool = polyorm::create_pool("postgres://app@localhost/app")?;
/// ```
pub fn create_pool(database_url: &str) -> OrmResult<Pool> {
    create_pool_with_tls(database_url, NoTls, DEFAULT_MAX_SIZE)
}

/// Create a pool using a custom TLS connector and size.
pub fn create_pool_with_tls<T>(database_url: &str, tls: T, max_size: usize) -> OrmResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let manager = Manager::from_config(
        pg_config,
        tls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

impl PgExecutor {
    /// Build a pooled executor straight from a database URL.
    pub fn connect(database_url: &str) -> OrmResult<Self> {
        create_pool(database_url).map(Self::from_pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_a_connection_error() {
        assert!(matches!(
            create_pool("definitely not a url"),
            Err(OrmError::Connection(_))
        ));
    }

    #[test]
    fn pool_is_built_lazily() {
        let pool = create_pool("postgres://app@localhost:1/app").unwrap();
        assert_eq!(pool.status().max_size, DEFAULT_MAX_SIZE);
    }
}
