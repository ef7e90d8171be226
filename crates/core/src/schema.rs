//! Declared field retirements.
//!
//! Removing a field from persisted records is an explicit, declared step:
//! each [`FieldRetirement`] names the entity kind, the legacy field and how
//! the removal treats `last_updated`. Stores apply a retirement with a
//! single atomic property removal.

use crate::record::StoredRecord;
use crate::types::EntityKind;

/// Whether applying a retirement bumps the record's `last_updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Leave `last_updated` untouched.
    Preserve,
    /// Set `last_updated` to now.
    Touch,
}

/// A legacy field scheduled for removal from one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRetirement {
    pub kind: EntityKind,
    pub field: &'static str,
    pub timestamp_policy: TimestampPolicy,
}

impl FieldRetirement {
    /// Whether `record` still carries the retired field.
    pub fn is_pending(&self, record: &StoredRecord) -> bool {
        record.kind == self.kind && record.has_property(self.field)
    }
}

/// `translator_ids` on collection rights records.
pub const RIGHTS_TRANSLATOR_IDS: FieldRetirement = FieldRetirement {
    kind: EntityKind::CollectionRights,
    field: "translator_ids",
    timestamp_policy: TimestampPolicy::Preserve,
};

/// Top-level `nodes` on collection records, superseded by
/// `collection_contents.nodes` in schema version 3.
///
/// The removal itself preserves the timestamp; the follow-up domain commit
/// is what bumps it.
pub const COLLECTION_NODES: FieldRetirement = FieldRetirement {
    kind: EntityKind::Collection,
    field: "nodes",
    timestamp_policy: TimestampPolicy::Preserve,
};
