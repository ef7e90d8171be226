use serde::{Deserialize, Serialize};

/// Record identifiers are opaque strings assigned by the authoring system.
pub type RecordId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The persisted entity kinds the maintenance sweeps operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    CollectionRights,
}

impl EntityKind {
    /// Model name used in sweep outcome keys and commit logs.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::Collection => "CollectionModel",
            Self::CollectionRights => "CollectionRightsModel",
        }
    }

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Collection => "collections",
            Self::CollectionRights => "collection_rights",
        }
    }

    /// Parse from the model name, returning `None` for unknown kinds.
    pub fn from_model_name(name: &str) -> Option<Self> {
        match name {
            "CollectionModel" => Some(Self::Collection),
            "CollectionRightsModel" => Some(Self::CollectionRights),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_round_trips() {
        for kind in [EntityKind::Collection, EntityKind::CollectionRights] {
            assert_eq!(EntityKind::from_model_name(kind.model_name()), Some(kind));
        }
        assert_eq!(EntityKind::from_model_name("ExplorationModel"), None);
    }

    #[test]
    fn display_uses_model_name() {
        assert_eq!(EntityKind::CollectionRights.to_string(), "CollectionRightsModel");
    }
}
