//! PostgreSQL backend
//!
//! Every mutation runs inside a scoped `sqlx::Transaction`: dropped on any
//! early return (rolled back), committed only at the end of the happy path.

mod accounts;
mod orders;
mod wallets;

use super::{StoreError, StoreResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Ledger, wallets and orders in PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        tracing::info!(max_connections, "PostgreSQL ledger ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Unique-constraint violation on `constraint`
fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint().is_some_and(|c| c == constraint)
        }
        _ => false,
    }
}

/// Rows that fail to parse back into models
fn corrupt(what: &str, id: impl std::fmt::Display, reason: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what} {id}: {reason}"))
}

fn ensure_found<T>(row: Option<T>, not_found: impl FnOnce() -> StoreError) -> StoreResult<T> {
    row.ok_or_else(not_found)
}
