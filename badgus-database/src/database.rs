use std::time::Duration;

use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};

use crate::cache::CacheService;

/// Schema migrations under `badgus-database/migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres pool plus the cache layered over it; cheap to clone.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
}

impl Database {
    /// Create a database handle from an existing pool, with caching disabled.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: CacheService::disabled("badgus:prod"),
        }
    }

    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(pool)
    }

    /// Pool shared by the `impls` query modules.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cache in front of hot lookups.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}
