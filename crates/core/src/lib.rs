//! Folio domain layer.
//!
//! Record shapes, the collection domain object with its validation and
//! schema migrations, change commands, and declared field retirements.
//! This crate has no database dependencies; everything operates on data
//! passed in by the caller.

pub mod change;
pub mod collection;
pub mod error;
pub mod migration;
pub mod record;
pub mod schema;
pub mod types;
