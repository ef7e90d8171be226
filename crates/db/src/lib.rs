//! Folio persistence layer.
//!
//! Postgres pool setup and migrations, row models, repositories, the
//! injected [`RecordStore`] abstraction with Postgres and in-memory
//! implementations, and the collection domain service built on top of it.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use service::{CollectionService, ServiceError};
pub use store::{PgRecordStore, RecordStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
