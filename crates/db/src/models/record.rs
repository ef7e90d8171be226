//! Row model shared by the `collections` and `collection_rights` tables.

use folio_core::record::StoredRecord;
use folio_core::types::{EntityKind, Timestamp};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from `collections` or `collection_rights`.
///
/// The kind is not stored in the row; it is implied by the table queried.
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub deleted: bool,
    pub schema_version: i32,
    pub version: i32,
    pub properties: serde_json::Value,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
}

impl RecordRow {
    /// Attach the entity kind and check that `properties` is an object.
    pub fn into_stored(self, kind: EntityKind) -> Result<StoredRecord, StoreError> {
        let properties = match self.properties {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StoreError::Corrupt {
                    kind,
                    id: self.id,
                    reason: format!("properties must be a JSON object, found {other}"),
                })
            }
        };
        Ok(StoredRecord {
            kind,
            id: self.id,
            deleted: self.deleted,
            schema_version: self.schema_version,
            version: self.version,
            properties,
            created_at: self.created_at,
            last_updated: self.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn row(properties: serde_json::Value) -> RecordRow {
        let now = chrono::Utc::now();
        RecordRow {
            id: "col-1".into(),
            deleted: false,
            schema_version: 2,
            version: 5,
            properties,
            created_at: now,
            last_updated: now,
        }
    }

    #[test]
    fn object_properties_convert() {
        let stored = row(json!({"title": "A"}))
            .into_stored(EntityKind::Collection)
            .unwrap();
        assert_eq!(stored.kind, EntityKind::Collection);
        assert_eq!(stored.version, 5);
        assert_eq!(stored.properties["title"], "A");
    }

    #[test]
    fn non_object_properties_are_corrupt() {
        assert_matches!(
            row(json!([1, 2])).into_stored(EntityKind::Collection),
            Err(StoreError::Corrupt { id, .. }) if id == "col-1"
        );
    }
}
