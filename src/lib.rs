//! # XRose - Rose diagram document engine
//!
//! Persistence core for circular-histogram ("rose") diagram documents.
//!
//! XRose provides:
//! - A transient in-memory SQLite working copy of each document
//! - Whole-database backup as the only load/save mechanism
//! - Fixed internal tables for window, geometry, layers, colors and datasets
//! - Polymorphic layer reconstruction from a base table and five subtype tables
//! - A background read that fans document state out to a delegate

pub mod config;
pub mod document;
pub mod encoding;
pub mod model;
pub mod storage;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use document::Document;
pub use model::{DataSet, GeometryController, Layer, LayerKind, Rgba, WindowSize};
pub use storage::{InMemoryStore, ReadSession, StoreDelegate, StoreUpdate};

/// Result type alias for XRose operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for XRose operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The in-memory handle is gone (construction failed or the store was closed)
    #[error("Database does not exist")]
    DatabaseUnavailable,

    #[error("Failed to initialize in-memory store: {0}")]
    Initialization(#[source] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Backup failed: {0}")]
    Backup(#[source] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The document was never saved, so there is no path to save to
    #[error("Document has no file yet; save it to a path first")]
    Untitled,

    /// A dataset value could not be coerced to a number
    #[error("Unknown value type {found} in {table}.{column}")]
    UnknownValueType {
        table: String,
        column: String,
        found: String,
    },

    /// A singleton table holds no row
    #[error("No row in {0}")]
    EmptyResult(&'static str),

    /// A base layer row has no single matching subtype row
    #[error("Invalid layers store: layer {layer_id} of type {layer_type:?} has no matching detail row")]
    InvalidLayersStore { layer_id: i64, layer_type: String },

    #[error("Layer reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("Table {0} is reserved for document storage")]
    ReservedTable(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Background read ended before completion")]
    ReadAborted,
}

impl Error {
    /// True for the recoverable "singleton table is empty" condition
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::EmptyResult(_))
    }
}
