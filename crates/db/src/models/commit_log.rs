//! Commit log row model.
//!
//! Maps to the `collection_commit_logs` table.

use folio_core::change::{CollectionChange, CommitLogEntry};
use folio_core::types::{EntityKind, Timestamp};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from the `collection_commit_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct CommitLogRow {
    pub id: i64,
    pub entity_kind: String,
    pub record_id: String,
    pub version: i32,
    pub actor_id: String,
    pub commit_message: String,
    pub commands: serde_json::Value,
    pub created_at: Timestamp,
}

impl TryFrom<CommitLogRow> for CommitLogEntry {
    type Error = StoreError;

    fn try_from(row: CommitLogRow) -> Result<Self, Self::Error> {
        let kind = EntityKind::from_model_name(&row.entity_kind)
            .ok_or_else(|| StoreError::UnknownKind(row.entity_kind.clone()))?;
        let commands: Vec<CollectionChange> =
            serde_json::from_value(row.commands).map_err(|e| StoreError::Corrupt {
                kind,
                id: row.record_id.clone(),
                reason: format!("commit {} has malformed commands: {e}", row.version),
            })?;
        Ok(Self {
            kind,
            record_id: row.record_id,
            version: row.version,
            actor_id: row.actor_id,
            commit_message: row.commit_message,
            commands,
            created_at: row.created_at,
        })
    }
}
