//! Layer types - one variant per kind of drawable layer
//!
//! A document draws its layers bottom to top:
//! - `Text`: free text annotation in a rectangle
//! - `LineArrow`: mean vector drawn from a dataset
//! - `Core`: the hollow core circle
//! - `Grid`: rings and radial spokes
//! - `Data`: histogram of a dataset (petals, dots, kites...)

use crate::model::Rgba;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Layer discriminator.
///
/// The tag strings are part of the on-disk format: they are stored in the
/// `TYPE` column of the base layer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Text,
    LineArrow,
    Core,
    Grid,
    Data,
}

impl LayerKind {
    /// Get the stored tag of the layer kind
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Text => "Text",
            LayerKind::LineArrow => "LineArrow",
            LayerKind::Core => "Core",
            LayerKind::Grid => "Grid",
            LayerKind::Data => "Data",
        }
    }

    /// Get all layer kinds
    pub fn all() -> &'static [LayerKind] {
        &[
            LayerKind::Text,
            LayerKind::LineArrow,
            LayerKind::Core,
            LayerKind::Grid,
            LayerKind::Data,
        ]
    }
}

impl FromStr for LayerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LayerKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Reconstruction(format!("Unknown layer type: {}", s)))
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Properties shared by every layer kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerProperties {
    pub visible: bool,
    pub active: bool,
    /// Treat directions as axial (0-180) instead of full circle
    pub bi_directional: bool,
    pub name: String,
    pub line_weight: f32,
    pub max_count: i32,
    pub max_percent: f32,
    pub stroke: Rgba,
    pub fill: Rgba,
}

impl LayerProperties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self {
            visible: true,
            active: false,
            bi_directional: false,
            name: String::new(),
            line_weight: 1.0,
            max_count: 0,
            max_percent: 0.0,
            stroke: Rgba::BLACK,
            fill: Rgba::BLACK,
        }
    }
}

/// Placement of a text layer, in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub properties: LayerProperties,
    pub contents: String,
    pub rect: TextRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineArrowLayer {
    pub properties: LayerProperties,
    /// `_id` of the dataset the vector is computed from
    pub dataset_id: i64,
    pub arrow_size: f32,
    pub vector_type: i32,
    pub arrow_type: i32,
    pub show_vector: bool,
    pub show_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreLayer {
    pub properties: LayerProperties,
    /// Core radius as a fraction of the plot radius
    pub radius: f32,
    pub core_type: bool,
}

/// Concentric ring settings of a grid layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRings {
    pub is_fixed_count: bool,
    pub visible: bool,
    pub show_labels: bool,
    pub fixed_count: i32,
    pub count_increment: i32,
    pub percent_increment: f32,
    pub label_angle: f32,
    pub font_name: String,
    pub font_size: f32,
}

impl Default for GridRings {
    fn default() -> Self {
        Self {
            is_fixed_count: false,
            visible: true,
            show_labels: true,
            fixed_count: 0,
            count_increment: 0,
            percent_increment: 0.0,
            label_angle: 0.0,
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
        }
    }
}

/// Radial spoke settings of a grid layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRadials {
    /// Number of spokes
    pub count: i32,
    pub angle: f32,
    pub label_alignment: i32,
    pub compass_point: i32,
    pub order: i32,
    pub font_name: String,
    pub font_size: f32,
    /// Lock spokes to sector boundaries
    pub sector_lock: bool,
    pub visible: bool,
    pub is_percent: bool,
    pub ticks: bool,
    pub minor_ticks: bool,
    pub labels: bool,
}

impl Default for GridRadials {
    fn default() -> Self {
        Self {
            count: 0,
            angle: 0.0,
            label_alignment: 0,
            compass_point: 0,
            order: 0,
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            sector_lock: false,
            visible: true,
            is_percent: false,
            ticks: true,
            minor_ticks: false,
            labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayer {
    pub properties: LayerProperties,
    pub rings: GridRings,
    pub radials: GridRadials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLayer {
    pub properties: LayerProperties,
    /// `_id` of the dataset plotted by this layer
    pub dataset_id: i64,
    pub plot_type: i32,
    pub total_count: i32,
    pub dot_radius: f32,
}

/// A drawable layer of a rose diagram document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layer {
    Text(TextLayer),
    LineArrow(LineArrowLayer),
    Core(CoreLayer),
    Grid(GridLayer),
    Data(DataLayer),
}

impl Layer {
    pub fn text(name: impl Into<String>, contents: impl Into<String>, rect: TextRect) -> Self {
        Layer::Text(TextLayer {
            properties: LayerProperties::named(name),
            contents: contents.into(),
            rect,
        })
    }

    pub fn core(name: impl Into<String>, radius: f32) -> Self {
        Layer::Core(CoreLayer {
            properties: LayerProperties::named(name),
            radius,
            core_type: false,
        })
    }

    pub fn grid(name: impl Into<String>) -> Self {
        Layer::Grid(GridLayer {
            properties: LayerProperties::named(name),
            rings: GridRings::default(),
            radials: GridRadials::default(),
        })
    }

    pub fn data(name: impl Into<String>, dataset_id: i64) -> Self {
        Layer::Data(DataLayer {
            properties: LayerProperties::named(name),
            dataset_id,
            plot_type: 0,
            total_count: 0,
            dot_radius: 0.0,
        })
    }

    pub fn line_arrow(name: impl Into<String>, dataset_id: i64) -> Self {
        Layer::LineArrow(LineArrowLayer {
            properties: LayerProperties::named(name),
            dataset_id,
            arrow_size: 1.0,
            vector_type: 0,
            arrow_type: 0,
            show_vector: true,
            show_error: false,
        })
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Text(_) => LayerKind::Text,
            Layer::LineArrow(_) => LayerKind::LineArrow,
            Layer::Core(_) => LayerKind::Core,
            Layer::Grid(_) => LayerKind::Grid,
            Layer::Data(_) => LayerKind::Data,
        }
    }

    pub fn properties(&self) -> &LayerProperties {
        match self {
            Layer::Text(l) => &l.properties,
            Layer::LineArrow(l) => &l.properties,
            Layer::Core(l) => &l.properties,
            Layer::Grid(l) => &l.properties,
            Layer::Data(l) => &l.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut LayerProperties {
        match self {
            Layer::Text(l) => &mut l.properties,
            Layer::LineArrow(l) => &mut l.properties,
            Layer::Core(l) => &mut l.properties,
            Layer::Grid(l) => &mut l.properties,
            Layer::Data(l) => &mut l.properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.properties().name
    }

    /// Dataset referenced by data and line-arrow layers
    pub fn dataset_id(&self) -> Option<i64> {
        match self {
            Layer::LineArrow(l) => Some(l.dataset_id),
            Layer::Data(l) => Some(l.dataset_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_roundtrip() {
        for kind in LayerKind::all() {
            let parsed: LayerKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
        assert_eq!(LayerKind::LineArrow.as_str(), "LineArrow");
    }

    #[test]
    fn test_unknown_kind_is_reconstruction_error() {
        let err = "Petal".parse::<LayerKind>().unwrap_err();
        assert!(matches!(err, Error::Reconstruction(_)));
        // Tags are stored verbatim, so matching is case-sensitive
        assert!("grid".parse::<LayerKind>().is_err());
    }

    #[test]
    fn test_dataset_reference() {
        assert_eq!(Layer::data("Petals", 4).dataset_id(), Some(4));
        assert_eq!(Layer::line_arrow("Mean", 2).dataset_id(), Some(2));
        assert_eq!(Layer::grid("Grid").dataset_id(), None);
    }

    #[test]
    fn test_layer_serializes_with_type_tag() {
        let json = serde_json::to_value(Layer::core("Core", 0.1)).unwrap();
        assert_eq!(json["type"], "Core");
        assert_eq!(json["properties"]["name"], "Core");
    }
}
