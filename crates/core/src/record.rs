//! The persisted record shape shared by every entity kind.
//!
//! A [`StoredRecord`] is what the store hands to a sweep: fixed bookkeeping
//! columns plus a JSON `properties` object holding the entity content.
//! Legacy fields stay in `properties` until a declared retirement removes
//! them (see [`crate::schema`]).

use serde::{Deserialize, Serialize};

use crate::types::{EntityKind, RecordId, Timestamp};

pub type Properties = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub kind: EntityKind,
    pub id: RecordId,
    pub deleted: bool,
    pub schema_version: i32,
    /// Commit counter, bumped by every domain update.
    pub version: i32,
    pub properties: Properties,
    pub created_at: Timestamp,
    pub last_updated: Timestamp,
}

impl StoredRecord {
    /// Build a fresh, non-deleted record at version 0.
    pub fn new(
        kind: EntityKind,
        id: impl Into<RecordId>,
        schema_version: i32,
        properties: Properties,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            kind,
            id: id.into(),
            deleted: false,
            schema_version,
            version: 0,
            properties,
            created_at: now,
            last_updated: now,
        }
    }

    /// Mark the record as tombstoned.
    pub fn tombstoned(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Whether `field` is still present in the stored properties.
    pub fn has_property(&self, field: &str) -> bool {
        self.properties.contains_key(field)
    }
}
