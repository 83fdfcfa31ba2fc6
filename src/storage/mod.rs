//! Storage Layer - SQLite-backed document persistence
//!
//! The working copy of a document is an in-memory SQLite database holding
//! ten internal tables:
//! - _windowController, _geometryController (singletons)
//! - _layers (base row per layer) plus _layerText, _layerLineArrow,
//!   _layerCore, _layerGrid, _layerData (one detail row per layer)
//! - _colors (palette referenced by layers)
//! - _datasets (selections over user tables)
//!
//! Every other table is user data.

pub mod affinity;
pub mod factory;
pub mod memory;
pub mod reader;
pub mod records;
pub mod schema;
pub mod sqlite;

pub use affinity::ColumnAffinity;
pub use factory::{StorageLayers, StorageModelFactory};
pub use memory::{InMemoryStore, SharedConnection};
pub use reader::{ReadOutcome, ReadSession, StoreDelegate, StoreUpdate};
pub use sqlite::{ColumnInfo, TableSummary};
