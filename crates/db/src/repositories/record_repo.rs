//! Repository for the `collections` and `collection_rights` tables.
//!
//! Both tables share one layout, so every method takes the [`EntityKind`]
//! and derives the table name from it.

use folio_core::record::StoredRecord;
use folio_core::types::EntityKind;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::record::RecordRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, deleted, schema_version, version, properties, created_at, last_updated";

/// Provides record access for both record tables.
pub struct RecordRepo;

impl RecordRepo {
    /// All record ids of `kind`, including tombstoned ones.
    pub async fn list_ids(pool: &PgPool, kind: EntityKind) -> Result<Vec<String>, sqlx::Error> {
        let query = format!("SELECT id FROM {} ORDER BY id", kind.table());
        sqlx::query_scalar::<_, String>(&query).fetch_all(pool).await
    }

    /// Find a single record by id, tombstoned or not.
    pub async fn find_by_id(
        pool: &PgPool,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<RecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", kind.table());
        sqlx::query_as::<_, RecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a record. Returns `false` if the id is already taken.
    pub async fn insert(pool: &PgPool, record: &StoredRecord) -> Result<bool, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
            record.kind.table()
        );
        let result = sqlx::query(&query)
            .bind(&record.id)
            .bind(record.deleted)
            .bind(record.schema_version)
            .bind(record.version)
            .bind(Json(&record.properties))
            .bind(record.created_at)
            .bind(record.last_updated)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a record if its stored version still equals
    /// `expected_version`, setting `last_updated` to now.
    ///
    /// Returns `false` when the version guard did not match (or the row is
    /// gone).
    pub async fn update_versioned(
        pool: &PgPool,
        record: &StoredRecord,
        expected_version: i32,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE {} \
             SET deleted = $3, schema_version = $4, version = $5, properties = $6, \
                 last_updated = NOW() \
             WHERE id = $1 AND version = $2",
            record.kind.table()
        );
        let result = sqlx::query(&query)
            .bind(&record.id)
            .bind(expected_version)
            .bind(record.deleted)
            .bind(record.schema_version)
            .bind(record.version)
            .bind(Json(&record.properties))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current stored version of a record, if it exists.
    pub async fn current_version(
        pool: &PgPool,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        let query = format!("SELECT version FROM {} WHERE id = $1", kind.table());
        sqlx::query_scalar::<_, i32>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Drop `field` from a record's properties in one statement.
    ///
    /// Returns `true` if the field was present and removed. When `touch` is
    /// false `last_updated` keeps its value.
    pub async fn remove_property(
        pool: &PgPool,
        kind: EntityKind,
        id: &str,
        field: &str,
        touch: bool,
    ) -> Result<bool, sqlx::Error> {
        let touch_clause = if touch { ", last_updated = NOW()" } else { "" };
        let query = format!(
            "UPDATE {} SET properties = properties - $2{touch_clause} \
             WHERE id = $1 AND properties ? $2",
            kind.table()
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(field)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
