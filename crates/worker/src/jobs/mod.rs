//! The maintenance sweeps.
//!
//! - [`CollectionMigrationJob`] persists collections upgraded to the
//!   current content schema.
//! - [`FieldRemovalJob`] applies one declared field retirement; two
//!   instances exist, for rights `translator_ids` and collection `nodes`.

pub mod collection_migration;
pub mod field_removal;

pub use collection_migration::CollectionMigrationJob;
pub use field_removal::FieldRemovalJob;
