//! services/api/src/adapters/pool.rs
//!
//! The process-wide PostgreSQL connection pool.
//!
//! The pool is created on the first successful `acquire` and reused by every later
//! call. A failed connection attempt is not cached, so the next caller tries again.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

pub struct SharedPool {
    database_url: String,
    max_connections: u32,
    pool: OnceCell<PgPool>,
}

impl SharedPool {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
            pool: OnceCell::new(),
        }
    }

    /// Returns the pool, connecting first if this is the first use.
    pub async fn acquire(&self) -> Result<PgPool, sqlx::Error> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                info!(
                    "Opening database pool (max {} connections)",
                    self.max_connections
                );
                PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(&self.database_url)
                    .await
            })
            .await?;
        Ok(pool.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_connections_are_not_cached() {
        let shared = SharedPool::new("not a database url", 1);
        assert!(shared.acquire().await.is_err());
        assert!(!shared.is_initialized());
        assert!(shared.acquire().await.is_err());
    }
}
