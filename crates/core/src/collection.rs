//! Collection domain object, loading, and validation.
//!
//! A [`Collection`] is always held at the current content schema version:
//! [`Collection::from_stored`] runs the migration chain on the stored
//! properties before deserializing them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::migration::{migrate_collection_properties, CURRENT_COLLECTION_SCHEMA_VERSION};
use crate::record::{Properties, StoredRecord};
use crate::types::{EntityKind, RecordId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length for title, category and objective.
pub const MAX_TEXT_FIELD_LEN: u64 = 200;

/// Language codes a collection may declare.
pub const SUPPORTED_LANGUAGE_CODES: &[&str] = &[
    "ar", "bn", "de", "en", "es", "fr", "hi", "id", "pt", "ru", "sw", "tr", "vi", "zh",
];

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// One exploration referenced by a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNode {
    pub exploration_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionContents {
    #[serde(default)]
    pub nodes: Vec<CollectionNode>,
}

/// Content fields as they appear in stored properties.
#[derive(Debug, Clone, Deserialize)]
struct ContentFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    objective: String,
    language_code: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    collection_contents: CollectionContents,
}

/// A collection at the current content schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct Collection {
    pub id: RecordId,
    #[validate(length(max = 200, message = "title is too long"))]
    pub title: String,
    #[validate(length(max = 200, message = "category is too long"))]
    pub category: String,
    #[validate(length(max = 200, message = "objective is too long"))]
    pub objective: String,
    #[validate(custom(function = "validate_language_code"))]
    pub language_code: String,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
    pub nodes: Vec<CollectionNode>,
    pub schema_version: i32,
    pub version: i32,
}

impl Collection {
    /// Load a collection from its stored record, upgrading the content to
    /// the current schema version in memory.
    pub fn from_stored(record: &StoredRecord) -> Result<Self, CoreError> {
        if record.kind != EntityKind::Collection {
            return Err(CoreError::Internal(format!(
                "Expected a {} record, got {}",
                EntityKind::Collection,
                record.kind
            )));
        }

        let mut props = record.properties.clone();
        let schema_version = migrate_collection_properties(&mut props, record.schema_version)?;
        let fields: ContentFields = serde_json::from_value(serde_json::Value::Object(props))
            .map_err(|e| {
                CoreError::Migration(format!("Collection {} has malformed content: {e}", record.id))
            })?;

        Ok(Self {
            id: record.id.clone(),
            title: fields.title,
            category: fields.category,
            objective: fields.objective,
            language_code: fields.language_code,
            tags: fields.tags,
            nodes: fields.collection_contents.nodes,
            schema_version,
            version: record.version,
        })
    }

    /// Content properties at the current schema version.
    ///
    /// Only domain fields are produced; callers merge them over the stored
    /// object so unrelated keys are kept.
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("title".into(), self.title.clone().into());
        props.insert("category".into(), self.category.clone().into());
        props.insert("objective".into(), self.objective.clone().into());
        props.insert("language_code".into(), self.language_code.clone().into());
        props.insert(
            "tags".into(),
            serde_json::Value::Array(self.tags.iter().cloned().map(Into::into).collect()),
        );
        props.insert(
            "collection_contents".into(),
            serde_json::json!({ "nodes": self.nodes }),
        );
        props
    }

    /// Exploration ids in node order.
    pub fn exploration_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.exploration_id.as_str()).collect()
    }

    /// Validate the collection.
    ///
    /// Non-strict validation checks structure only. Strict validation also
    /// requires the fields a published collection must have.
    pub fn validate(&self, strict: bool) -> Result<(), CoreError> {
        if self.schema_version != CURRENT_COLLECTION_SCHEMA_VERSION {
            return Err(CoreError::Validation(format!(
                "Expected schema version to be {CURRENT_COLLECTION_SCHEMA_VERSION}, received {}",
                self.schema_version
            )));
        }

        Validate::validate(self).map_err(|e| CoreError::Validation(e.to_string()))?;

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.exploration_id.trim().is_empty() {
                return Err(CoreError::Validation(
                    "Expected exploration ID to be a non-empty string".into(),
                ));
            }
            if !seen.insert(node.exploration_id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "There are explorations referenced in the collection more than once: {}",
                    node.exploration_id
                )));
            }
        }

        if strict {
            for (name, value) in [
                ("title", &self.title),
                ("category", &self.category),
                ("objective", &self.objective),
            ] {
                if value.trim().is_empty() {
                    return Err(CoreError::Validation(format!(
                        "A {name} must be specified for the collection."
                    )));
                }
            }
            if self.nodes.is_empty() {
                return Err(CoreError::Validation(
                    "Expected to have at least 1 exploration in the collection.".into(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

fn validate_language_code(code: &str) -> Result<(), ValidationError> {
    if SUPPORTED_LANGUAGE_CODES.contains(&code) {
        Ok(())
    } else {
        Err(ValidationError::new("language_code")
            .with_message(format!("Invalid language code: {code}").into()))
    }
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for tag in tags {
        let problem = if tag.is_empty() {
            Some("Tags should be non-empty.".to_string())
        } else if tag != &tag.to_lowercase() {
            Some(format!("Tags should only contain lowercase letters and spaces, received {tag}"))
        } else if tag.trim() != tag {
            Some(format!("Tags should not start or end with whitespace, received {tag}"))
        } else if tag.contains("  ") {
            Some(format!("Adjacent whitespace in tags should be collapsed, received {tag}"))
        } else if !seen.insert(tag.as_str()) {
            Some("Some tags duplicate each other".to_string())
        } else {
            None
        };

        if let Some(message) = problem {
            return Err(ValidationError::new("tags").with_message(message.into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn record(schema_version: i32, props: serde_json::Value) -> StoredRecord {
        StoredRecord::new(
            EntityKind::Collection,
            "col-1",
            schema_version,
            props.as_object().cloned().unwrap_or_default(),
        )
    }

    fn valid_collection() -> Collection {
        Collection::from_stored(&record(
            CURRENT_COLLECTION_SCHEMA_VERSION,
            json!({
                "title": "Fractions",
                "category": "Mathematics",
                "objective": "Learn fractions",
                "language_code": "en",
                "tags": ["math", "number sense"],
                "collection_contents": {"nodes": [{"exploration_id": "exp-1"}]}
            }),
        ))
        .unwrap()
    }

    #[test]
    fn from_stored_upgrades_old_content() {
        let c = Collection::from_stored(&record(
            1,
            json!({"title": "Old", "nodes": [{"exploration_id": "exp-9"}]}),
        ))
        .unwrap();
        assert_eq!(c.schema_version, CURRENT_COLLECTION_SCHEMA_VERSION);
        assert_eq!(c.language_code, "en");
        assert_eq!(c.exploration_ids(), vec!["exp-9"]);
    }

    #[test]
    fn from_stored_rejects_other_kinds() {
        let mut r = record(CURRENT_COLLECTION_SCHEMA_VERSION, json!({}));
        r.kind = EntityKind::CollectionRights;
        assert_matches!(Collection::from_stored(&r), Err(CoreError::Internal(_)));
    }

    #[test]
    fn to_properties_round_trips() {
        let c = valid_collection();
        let reloaded = Collection::from_stored(&record(
            CURRENT_COLLECTION_SCHEMA_VERSION,
            serde_json::Value::Object(c.to_properties()),
        ))
        .unwrap();
        assert_eq!(reloaded, c);
    }

    #[test]
    fn valid_collection_passes_both_modes() {
        let c = valid_collection();
        assert!(c.validate(false).is_ok());
        assert!(c.validate(true).is_ok());
    }

    #[test]
    fn strict_requires_title_and_nodes() {
        let mut c = valid_collection();
        c.title.clear();
        assert!(c.validate(false).is_ok());
        assert_matches!(c.validate(true), Err(CoreError::Validation(msg)) if msg.contains("title"));

        let mut c = valid_collection();
        c.nodes.clear();
        assert!(c.validate(false).is_ok());
        assert_matches!(c.validate(true), Err(CoreError::Validation(_)));
    }

    #[test]
    fn unsupported_language_fails() {
        let mut c = valid_collection();
        c.language_code = "xx".into();
        assert_matches!(c.validate(false), Err(CoreError::Validation(msg)) if msg.contains("xx"));
    }

    #[test]
    fn bad_tags_fail() {
        for tags in [
            vec!["Math".to_string()],
            vec!["".to_string()],
            vec![" math".to_string()],
            vec!["number  sense".to_string()],
            vec!["math".to_string(), "math".to_string()],
        ] {
            let mut c = valid_collection();
            c.tags = tags.clone();
            assert!(c.validate(false).is_err(), "tags {tags:?} should be rejected");
        }
    }

    #[test]
    fn duplicate_nodes_fail() {
        let mut c = valid_collection();
        c.nodes.push(CollectionNode { exploration_id: "exp-1".into() });
        assert_matches!(c.validate(false), Err(CoreError::Validation(msg)) if msg.contains("exp-1"));
    }

    #[test]
    fn overlong_title_fails() {
        let mut c = valid_collection();
        c.title = "t".repeat(MAX_TEXT_FIELD_LEN as usize + 1);
        assert!(c.validate(false).is_err());
    }

    #[test]
    fn stale_schema_version_fails() {
        let mut c = valid_collection();
        c.schema_version = 2;
        assert_matches!(c.validate(false), Err(CoreError::Validation(msg)) if msg.contains("schema version"));
    }
}
