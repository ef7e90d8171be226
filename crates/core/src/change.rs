//! Collection change commands and commit log entries.
//!
//! Commands are serialized with a `cmd` tag so commit logs stay readable
//! as plain JSON.

use serde::{Deserialize, Serialize};

use crate::collection::{Collection, CollectionNode};
use crate::error::CoreError;
use crate::types::{EntityKind, RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Actor recorded on commits made by maintenance sweeps.
pub const MIGRATION_BOT_USERNAME: &str = "FolioMigrationBot";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A single semantic change applied by `update_collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CollectionChange {
    /// Content was upgraded on load; the commit persists it.
    ///
    /// `to_version` is a string to match historical commit logs.
    MigrateSchemaToLatestVersion { from_version: i32, to_version: String },
    AddCollectionNode { exploration_id: String },
    DeleteCollectionNode { exploration_id: String },
    EditCollectionProperty {
        property_name: String,
        new_value: serde_json::Value,
    },
    /// The legacy top-level `nodes` property was dropped from storage.
    RemoveNode,
}

/// Apply `changes` to `collection` in order.
///
/// Stops at the first change that cannot be applied; the collection may be
/// partially modified in that case and must be discarded by the caller.
pub fn apply_changes(
    collection: &mut Collection,
    changes: &[CollectionChange],
) -> Result<(), CoreError> {
    for change in changes {
        match change {
            // Migration happened on load; these only mark the commit.
            CollectionChange::MigrateSchemaToLatestVersion { .. } | CollectionChange::RemoveNode => {}
            CollectionChange::AddCollectionNode { exploration_id } => {
                if collection.exploration_ids().contains(&exploration_id.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "Exploration is already part of this collection: {exploration_id}"
                    )));
                }
                collection.nodes.push(CollectionNode {
                    exploration_id: exploration_id.clone(),
                });
            }
            CollectionChange::DeleteCollectionNode { exploration_id } => {
                let before = collection.nodes.len();
                collection
                    .nodes
                    .retain(|n| &n.exploration_id != exploration_id);
                if collection.nodes.len() == before {
                    return Err(CoreError::Validation(format!(
                        "Exploration is not part of this collection: {exploration_id}"
                    )));
                }
            }
            CollectionChange::EditCollectionProperty {
                property_name,
                new_value,
            } => edit_property(collection, property_name, new_value)?,
        }
    }
    Ok(())
}

fn edit_property(
    collection: &mut Collection,
    property_name: &str,
    new_value: &serde_json::Value,
) -> Result<(), CoreError> {
    let as_string = || {
        new_value.as_str().map(str::to_string).ok_or_else(|| {
            CoreError::Validation(format!("Expected '{property_name}' to be a string"))
        })
    };

    match property_name {
        "title" => collection.title = as_string()?,
        "category" => collection.category = as_string()?,
        "objective" => collection.objective = as_string()?,
        "language_code" => collection.language_code = as_string()?,
        "tags" => {
            collection.tags = serde_json::from_value(new_value.clone()).map_err(|_| {
                CoreError::Validation("Expected 'tags' to be a list of strings".into())
            })?;
        }
        other => {
            return Err(CoreError::Validation(format!(
                "Invalid collection property: '{other}'"
            )))
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commit log
// ---------------------------------------------------------------------------

/// One committed domain update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitLogEntry {
    pub kind: EntityKind,
    pub record_id: RecordId,
    /// Record version produced by this commit.
    pub version: i32,
    pub actor_id: String,
    pub commit_message: String,
    pub commands: Vec<CollectionChange>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::migration::CURRENT_COLLECTION_SCHEMA_VERSION;

    fn collection() -> Collection {
        Collection {
            id: "col-1".into(),
            title: "Fractions".into(),
            category: "Mathematics".into(),
            objective: "Learn".into(),
            language_code: "en".into(),
            tags: vec![],
            nodes: vec![CollectionNode {
                exploration_id: "exp-1".into(),
            }],
            schema_version: CURRENT_COLLECTION_SCHEMA_VERSION,
            version: 3,
        }
    }

    #[test]
    fn migrate_command_serializes_with_cmd_tag() {
        let change = CollectionChange::MigrateSchemaToLatestVersion {
            from_version: 2,
            to_version: "4".into(),
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"cmd": "migrate_schema_to_latest_version", "from_version": 2, "to_version": "4"})
        );
    }

    #[test]
    fn remove_node_serializes_as_bare_cmd() {
        assert_eq!(
            serde_json::to_value(CollectionChange::RemoveNode).unwrap(),
            json!({"cmd": "remove_node"})
        );
    }

    #[test]
    fn marker_changes_leave_content_alone() {
        let mut c = collection();
        apply_changes(
            &mut c,
            &[
                CollectionChange::MigrateSchemaToLatestVersion {
                    from_version: 1,
                    to_version: "4".into(),
                },
                CollectionChange::RemoveNode,
            ],
        )
        .unwrap();
        assert_eq!(c, collection());
    }

    #[test]
    fn add_and_delete_nodes() {
        let mut c = collection();
        apply_changes(
            &mut c,
            &[
                CollectionChange::AddCollectionNode {
                    exploration_id: "exp-2".into(),
                },
                CollectionChange::DeleteCollectionNode {
                    exploration_id: "exp-1".into(),
                },
            ],
        )
        .unwrap();
        assert_eq!(c.exploration_ids(), vec!["exp-2"]);
    }

    #[test]
    fn adding_duplicate_node_fails() {
        let mut c = collection();
        assert_matches!(
            apply_changes(
                &mut c,
                &[CollectionChange::AddCollectionNode {
                    exploration_id: "exp-1".into()
                }]
            ),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn deleting_missing_node_fails() {
        let mut c = collection();
        assert_matches!(
            apply_changes(
                &mut c,
                &[CollectionChange::DeleteCollectionNode {
                    exploration_id: "exp-404".into()
                }]
            ),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn edit_properties() {
        let mut c = collection();
        apply_changes(
            &mut c,
            &[
                CollectionChange::EditCollectionProperty {
                    property_name: "title".into(),
                    new_value: json!("Decimals"),
                },
                CollectionChange::EditCollectionProperty {
                    property_name: "tags".into(),
                    new_value: json!(["math"]),
                },
            ],
        )
        .unwrap();
        assert_eq!(c.title, "Decimals");
        assert_eq!(c.tags, vec!["math".to_string()]);
    }

    #[test]
    fn edit_unknown_or_mistyped_property_fails() {
        let mut c = collection();
        assert_matches!(
            apply_changes(
                &mut c,
                &[CollectionChange::EditCollectionProperty {
                    property_name: "nodes".into(),
                    new_value: json!([]),
                }]
            ),
            Err(CoreError::Validation(msg)) if msg.contains("nodes")
        );
        assert_matches!(
            apply_changes(
                &mut c,
                &[CollectionChange::EditCollectionProperty {
                    property_name: "title".into(),
                    new_value: json!(7),
                }]
            ),
            Err(CoreError::Validation(_))
        );
    }
}
