//! Repository for the `collection_commit_logs` table.

use folio_core::change::CommitLogEntry;
use folio_core::types::EntityKind;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::commit_log::CommitLogRow;

const COLUMNS: &str =
    "id, entity_kind, record_id, version, actor_id, commit_message, commands, created_at";

/// Provides append and lookup for commit log entries.
pub struct CommitLogRepo;

impl CommitLogRepo {
    /// Append a commit entry, returning its row id.
    pub async fn insert(pool: &PgPool, entry: &CommitLogEntry) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO collection_commit_logs \
                (entity_kind, record_id, version, actor_id, commit_message, commands, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(entry.kind.model_name())
        .bind(&entry.record_id)
        .bind(entry.version)
        .bind(&entry.actor_id)
        .bind(&entry.commit_message)
        .bind(Json(&entry.commands))
        .bind(entry.created_at)
        .fetch_one(pool)
        .await
    }

    /// All commits for one record, oldest first.
    pub async fn list_for_record(
        pool: &PgPool,
        kind: EntityKind,
        record_id: &str,
    ) -> Result<Vec<CommitLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collection_commit_logs \
             WHERE entity_kind = $1 AND record_id = $2 \
             ORDER BY version ASC"
        );
        sqlx::query_as::<_, CommitLogRow>(&query)
            .bind(kind.model_name())
            .bind(record_id)
            .fetch_all(pool)
            .await
    }
}
