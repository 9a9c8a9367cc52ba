//! Copies one Redmine project, and everything it owns, from a source database
//! into a destination database that already holds unrelated data.
//!
//! Rows receive new primary keys on insert, so every foreign key is rewritten
//! through a per-run [`TranslationStore`]. Values that point at instance-wide
//! records (users, priorities, enumerations, trackers, issue statuses) are
//! rewritten through operator supplied [`ManualMappings`] instead. The
//! traversal order is fixed by [`EntityType::dependency_order`].

mod config;
mod entity;
mod error;
mod mapping;
mod memory;
mod migrator;
mod orchestrator;
mod report;
mod resolver;
mod row;
mod store;
mod translation;

#[cfg(test)]
mod fixtures;

pub use config::MigrationConfig;
pub use entity::{ContainerType, EntityType, FieldRule};
pub use error::MigrateError;
pub use mapping::{ManualMappings, MappingKind, UnmappedValue};
pub use memory::MemoryStore;
pub use orchestrator::{run_migration, ProjectMigrator};
pub use report::Report;
pub use resolver::{source_id, Resolver};
pub use row::{row, Criterion, Filter, Row, RowId, Value, ID_COLUMN};
pub use store::{DestinationStore, SourceStore, StoreError, StoreOperation};
pub use translation::TranslationStore;
