//! # Relata - Relationship-Aware Object Persistence
//!
//! Maps typed records with declared relationships onto SQLite.
//!
//! Relata provides:
//! - Declarative entity descriptors compiled into a table/relationship graph
//! - Schema synthesis (DDL) on first open of an empty store
//! - An identity map guaranteeing one live instance per (entity type, id)
//! - CRUD and equality-filtered queries with bidirectional value marshalling
//! - Relationship traversal: one, many, set_one, add, remove, remove_all
//! - Cascading delete driven by the resolved dependency graph

pub mod value;
pub mod marshal;
pub mod descriptor;
pub mod schema;
pub mod record;
pub mod identity;
pub mod event;
pub mod store;

// Re-exports for convenient access
pub use value::{Color, FieldType, Value};
pub use marshal::{SqlValue, StorageClass};
pub use descriptor::EntityDescriptor;
pub use schema::{EntityType, Relationship, RelationshipKind, Schema};
pub use record::{Record, RecordRef};
pub use event::StoreEvent;
pub use store::Store;

/// Result type alias for Relata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Relata operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Duplicate entity type: {0}")]
    DuplicateEntityType(String),

    #[error("Invalid relationship spec: {0}")]
    InvalidRelationshipSpec(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
