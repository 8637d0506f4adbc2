//! # Database Persistence Layer
//!
//! Postgres persistence for credential records via SQLx.
//!
//! The database is **optional**. With `STORE_BACKEND=postgres` the registry
//! persists records to the `credentials` table; otherwise it runs over the
//! in-memory store (suitable for development and testing).
//!
//! Blobs are never stored here; see `MEDIA_ROOT`.

pub mod credentials;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
