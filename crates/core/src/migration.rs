//! Collection content schema migrations.
//!
//! Stored collection properties carry the shape of the schema version they
//! were written at. [`migrate_collection_properties`] walks them forward
//! one version at a time until they reach
//! [`CURRENT_COLLECTION_SCHEMA_VERSION`].

use serde_json::{json, Value};

use crate::error::CoreError;
use crate::record::Properties;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The schema version every live collection is migrated to.
pub const CURRENT_COLLECTION_SCHEMA_VERSION: i32 = 4;

/// Oldest schema version that can still be migrated.
pub const MIN_COLLECTION_SCHEMA_VERSION: i32 = 1;

/// Language assigned to collections written before language codes existed.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Per-node keys dropped in schema version 4.
const DEPRECATED_NODE_KEYS: &[&str] = &["prerequisite_skills", "acquired_skills"];

// ---------------------------------------------------------------------------
// Migration chain
// ---------------------------------------------------------------------------

/// Upgrade `props` in place from `from_version` to the current version.
///
/// Returns the version the properties now conform to. Properties already at
/// the current version are left untouched.
pub fn migrate_collection_properties(
    props: &mut Properties,
    from_version: i32,
) -> Result<i32, CoreError> {
    if !(MIN_COLLECTION_SCHEMA_VERSION..=CURRENT_COLLECTION_SCHEMA_VERSION).contains(&from_version)
    {
        return Err(CoreError::Migration(format!(
            "Sorry, we can only process v{MIN_COLLECTION_SCHEMA_VERSION}-v{CURRENT_COLLECTION_SCHEMA_VERSION} \
             collection schemas at present, received v{from_version}"
        )));
    }

    let mut version = from_version;
    while version < CURRENT_COLLECTION_SCHEMA_VERSION {
        match version {
            1 => convert_v1_to_v2(props),
            2 => convert_v2_to_v3(props)?,
            3 => convert_v3_to_v4(props)?,
            other => {
                return Err(CoreError::Migration(format!(
                    "No migration registered from collection schema v{other}"
                )))
            }
        }
        version += 1;
    }
    Ok(version)
}

/// v1 → v2: introduce `language_code` and `tags`.
fn convert_v1_to_v2(props: &mut Properties) {
    props
        .entry("language_code")
        .or_insert_with(|| json!(DEFAULT_LANGUAGE_CODE));
    props.entry("tags").or_insert_with(|| json!([]));
}

/// v2 → v3: copy top-level `nodes` into `collection_contents`.
///
/// The top-level `nodes` key is left behind as a legacy field.
fn convert_v2_to_v3(props: &mut Properties) -> Result<(), CoreError> {
    let nodes = match props.get("nodes") {
        None | Some(Value::Null) => Value::Array(Vec::new()),
        Some(Value::Array(nodes)) => Value::Array(nodes.clone()),
        Some(other) => {
            return Err(CoreError::Migration(format!(
                "Expected 'nodes' to be a list, received {other}"
            )))
        }
    };
    props.insert("collection_contents".into(), json!({ "nodes": nodes }));
    Ok(())
}

/// v3 → v4: strip deprecated per-node skill keys.
fn convert_v3_to_v4(props: &mut Properties) -> Result<(), CoreError> {
    let nodes = props
        .get_mut("collection_contents")
        .and_then(|contents| contents.get_mut("nodes"))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| {
            CoreError::Migration("Expected 'collection_contents.nodes' to be a list".into())
        })?;

    for node in nodes.iter_mut() {
        if let Some(obj) = node.as_object_mut() {
            for key in DEPRECATED_NODE_KEYS {
                obj.remove(*key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap_or_default()
    }

    fn v1_props() -> Properties {
        props(json!({
            "title": "Fractions",
            "category": "Mathematics",
            "objective": "Learn fractions",
            "nodes": [
                {"exploration_id": "exp-1", "prerequisite_skills": [], "acquired_skills": ["a"]},
                {"exploration_id": "exp-2"}
            ]
        }))
    }

    #[test]
    fn v1_reaches_current_version() {
        let mut p = v1_props();
        let version = migrate_collection_properties(&mut p, 1).unwrap();
        assert_eq!(version, CURRENT_COLLECTION_SCHEMA_VERSION);
        assert_eq!(p["language_code"], "en");
        assert_eq!(p["tags"], json!([]));
        assert_eq!(
            p["collection_contents"]["nodes"],
            json!([{"exploration_id": "exp-1"}, {"exploration_id": "exp-2"}])
        );
    }

    #[test]
    fn v2_to_v3_keeps_legacy_nodes() {
        let mut p = v1_props();
        migrate_collection_properties(&mut p, 2).unwrap();
        assert!(p.contains_key("nodes"), "legacy top-level nodes must survive");
    }

    #[test]
    fn existing_language_code_is_not_overwritten() {
        let mut p = v1_props();
        p.insert("language_code".into(), json!("fr"));
        migrate_collection_properties(&mut p, 1).unwrap();
        assert_eq!(p["language_code"], "fr");
    }

    #[test]
    fn missing_nodes_become_empty_contents() {
        let mut p = props(json!({"title": "Empty"}));
        migrate_collection_properties(&mut p, 2).unwrap();
        assert_eq!(p["collection_contents"]["nodes"], json!([]));
    }

    #[test]
    fn current_version_is_noop() {
        let mut p = props(json!({"collection_contents": {"nodes": []}, "title": "x"}));
        let before = p.clone();
        let version =
            migrate_collection_properties(&mut p, CURRENT_COLLECTION_SCHEMA_VERSION).unwrap();
        assert_eq!(version, CURRENT_COLLECTION_SCHEMA_VERSION);
        assert_eq!(p, before);
    }

    #[test]
    fn out_of_range_versions_are_rejected() {
        let mut p = v1_props();
        assert_matches!(
            migrate_collection_properties(&mut p, 0),
            Err(CoreError::Migration(_))
        );
        assert_matches!(
            migrate_collection_properties(&mut p, CURRENT_COLLECTION_SCHEMA_VERSION + 1),
            Err(CoreError::Migration(_))
        );
    }

    #[test]
    fn malformed_nodes_fail_migration() {
        let mut p = props(json!({"nodes": "exp-1"}));
        assert_matches!(
            migrate_collection_properties(&mut p, 2),
            Err(CoreError::Migration(msg)) if msg.contains("nodes")
        );
    }
}
