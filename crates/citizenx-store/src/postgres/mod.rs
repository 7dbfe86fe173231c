//! PostgreSQL backend. Queries are checked at runtime rather than compile time so the
//! crate builds without a live database.

mod posts;
mod reports;
mod users;

use sqlx::PgPool;
use sqlx::postgres::{PgPoolOptions, PgQueryResult};
use tracing::info;

use crate::StoreError;

/// Repositories backed by a shared connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("connected to database (max {max_connections} connections)");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("database migrations complete");
        Ok(())
    }
}

/// Turns an UPDATE or DELETE that touched nothing into `NotFound`.
fn require_row(result: PgQueryResult, what: &'static str) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(what));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PgStore;

    /// Connects to `DATABASE_URL` and brings the schema up to date.
    pub async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();
        store
    }
}
