use folio_core::types::{EntityKind, RecordId};

/// Failures raised by a [`RecordStore`](crate::store::RecordStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {kind} with id {id}")]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("Version conflict on {kind} {id}: expected version {expected}, found {found}")]
    VersionConflict {
        kind: EntityKind,
        id: RecordId,
        expected: i32,
        found: i32,
    },

    #[error("Record already exists: {kind} with id {id}")]
    AlreadyExists { kind: EntityKind, id: RecordId },

    #[error("Corrupt row {kind} {id}: {reason}")]
    Corrupt {
        kind: EntityKind,
        id: RecordId,
        reason: String,
    },

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
