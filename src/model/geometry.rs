//! Rose diagram geometry settings
//!
//! The projection math lives elsewhere; this is only the state it reads.

use serde::{Deserialize, Serialize};

/// Geometry shared by every layer of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryController {
    /// Equal-area (true) or linear (false) radius projection
    pub is_equal_area: bool,
    /// Scale rings by percentage instead of raw counts
    pub is_percent: bool,
    pub max_count: i32,
    pub max_percent: f32,
    /// Radius of the hollow core, relative to the plot radius
    pub hollow_core: f32,
    /// Width of one sector in degrees
    pub sector_size: f32,
    /// Angle of the first sector boundary in degrees
    pub starting_angle: f32,
    pub sector_count: i32,
    /// Plot circle size relative to the drawing rect
    pub relative_size: f32,
}

impl Default for GeometryController {
    fn default() -> Self {
        Self {
            is_equal_area: false,
            is_percent: false,
            max_count: 10,
            max_percent: 0.3,
            hollow_core: 0.0,
            sector_size: 10.0,
            starting_angle: 0.0,
            sector_count: 36,
            relative_size: 0.9,
        }
    }
}
