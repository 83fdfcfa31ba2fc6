//! Domain model - the in-memory document graph
//!
//! These are the values the UI layer works with. They never touch SQL;
//! `storage::factory` translates them to and from flat table records.

pub mod color;
pub mod dataset;
pub mod geometry;
pub mod layer;
pub mod window;

pub use color::Rgba;
pub use dataset::DataSet;
pub use geometry::GeometryController;
pub use layer::{
    CoreLayer, DataLayer, GridLayer, GridRadials, GridRings, Layer, LayerKind, LayerProperties,
    LineArrowLayer, TextLayer, TextRect,
};
pub use window::WindowSize;
