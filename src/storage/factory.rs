//! Record <-> domain mapping
//!
//! `StorageModelFactory` is the single place that translates between the
//! `Layer` sum type and its base/detail records. The discriminator string is
//! only interpreted here.

use super::records::{
    ColorRecord, DataSetRecord, GeometryRecord, LayerCoreRecord, LayerDataRecord,
    LayerDetailRecord, LayerGridRecord, LayerLineArrowRecord, LayerRecord, LayerTextRecord,
};
use crate::encoding;
use crate::model::{
    CoreLayer, DataLayer, DataSet, GeometryController, GridLayer, GridRadials, GridRings, Layer,
    LayerKind, LayerProperties, LineArrowLayer, Rgba, TextLayer, TextRect,
};
use crate::{Error, Result};

/// Stroke color used when a stored color id has no palette entry
pub const DEFAULT_STROKE: Rgba = Rgba::BLACK;
/// Fill color used when a stored color id has no palette entry
pub const DEFAULT_FILL: Rgba = Rgba::WHITE;

/// The two rows storing one layer
#[derive(Debug, Clone, PartialEq)]
pub struct StorageLayers {
    pub base: LayerRecord,
    pub detail: LayerDetailRecord,
}

/// Translates domain objects to storage records and back.
///
/// Holds the color palette: loaded palette rows before reconstruction, or the
/// palette collected while layers are converted for storage.
#[derive(Debug, Default, Clone)]
pub struct StorageModelFactory {
    colors: Vec<ColorRecord>,
}

impl StorageModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache palette rows for subsequent reconstruction
    pub fn set_colors(&mut self, colors: Vec<ColorRecord>) {
        self.colors = colors;
    }

    pub fn clear_colors(&mut self) {
        self.colors.clear();
    }

    pub fn colors(&self) -> &[ColorRecord] {
        &self.colors
    }

    pub fn color(&self, id: i64) -> Option<Rgba> {
        self.colors
            .iter()
            .find(|c| c.id == id)
            .map(|c| Rgba::new(c.red, c.green, c.blue, c.alpha))
    }

    fn resolve(&self, id: Option<i64>, fallback: Rgba) -> Rgba {
        id.and_then(|id| self.color(id)).unwrap_or(fallback)
    }

    /// Palette id of `color`, adding it when not yet present.
    ///
    /// Entries are de-duplicated by value and numbered from 1.
    pub fn palette_id(&mut self, color: Rgba) -> i64 {
        if let Some(existing) = self.colors.iter().find(|c| {
            c.red == color.red && c.green == color.green && c.blue == color.blue && c.alpha == color.alpha
        }) {
            return existing.id;
        }

        let id = self.colors.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        self.colors.push(ColorRecord {
            id,
            red: color.red,
            green: color.green,
            blue: color.blue,
            alpha: color.alpha,
        });
        id
    }

    // ========== Geometry ==========

    pub fn storage_geometry(&self, controller: &GeometryController) -> GeometryRecord {
        GeometryRecord {
            is_equal_area: controller.is_equal_area,
            is_percent: controller.is_percent,
            max_count: controller.max_count,
            max_percent: controller.max_percent,
            hollow_core: controller.hollow_core,
            sector_size: controller.sector_size,
            starting_angle: controller.starting_angle,
            sector_count: controller.sector_count,
            relative_size: controller.relative_size,
        }
    }

    /// Apply a stored geometry row onto `controller`
    pub fn configure_geometry(&self, controller: &mut GeometryController, record: &GeometryRecord) {
        controller.is_equal_area = record.is_equal_area;
        controller.is_percent = record.is_percent;
        controller.max_count = record.max_count;
        controller.max_percent = record.max_percent;
        controller.hollow_core = record.hollow_core;
        controller.sector_size = record.sector_size;
        controller.starting_angle = record.starting_angle;
        controller.sector_count = record.sector_count;
        controller.relative_size = record.relative_size;
    }

    pub fn geometry_from(&self, record: &GeometryRecord) -> GeometryController {
        let mut controller = GeometryController::default();
        self.configure_geometry(&mut controller, record);
        controller
    }

    // ========== Layers ==========

    /// Produce the base and detail rows for the layer at display position `index`.
    ///
    /// The position doubles as the layer id, which keeps ids stable across a
    /// store/read cycle and unique within one write.
    pub fn storage_layers(&mut self, layer: &Layer, index: usize) -> StorageLayers {
        let layer_id = index as i64;
        let props = layer.properties();
        let stroke_color_id = self.palette_id(props.stroke);
        let fill_color_id = self.palette_id(props.fill);

        let base = LayerRecord {
            layer_id,
            layer_type: layer.kind().as_str().to_string(),
            visible: props.visible,
            active: props.active,
            bi_directional: props.bi_directional,
            name: props.name.clone(),
            line_weight: props.line_weight,
            max_count: props.max_count,
            max_percent: props.max_percent,
            stroke_color_id: Some(stroke_color_id),
            fill_color_id: Some(fill_color_id),
        };

        let detail = match layer {
            Layer::Text(text) => LayerDetailRecord::Text(LayerTextRecord {
                layer_id,
                contents: encoding::encode_text(&text.contents),
                x: text.rect.x,
                y: text.rect.y,
                height: text.rect.height,
                width: text.rect.width,
            }),
            Layer::LineArrow(arrow) => LayerDetailRecord::LineArrow(LayerLineArrowRecord {
                layer_id,
                dataset: arrow.dataset_id,
                arrow_size: arrow.arrow_size,
                vector_type: arrow.vector_type,
                arrow_type: arrow.arrow_type,
                show_vector: arrow.show_vector,
                show_error: arrow.show_error,
            }),
            Layer::Core(core) => LayerDetailRecord::Core(LayerCoreRecord {
                layer_id,
                radius: core.radius,
                core_type: core.core_type,
            }),
            Layer::Grid(grid) => LayerDetailRecord::Grid(LayerGridRecord {
                layer_id,
                rings_is_fixed_count: grid.rings.is_fixed_count,
                rings_visible: grid.rings.visible,
                rings_labels: grid.rings.show_labels,
                rings_fixed_count: grid.rings.fixed_count,
                rings_count_increment: grid.rings.count_increment,
                rings_percent_increment: grid.rings.percent_increment,
                rings_label_angle: grid.rings.label_angle,
                rings_font_name: grid.rings.font_name.clone(),
                rings_font_size: grid.rings.font_size,
                radials_count: grid.radials.count,
                radials_angle: grid.radials.angle,
                radials_label_align: grid.radials.label_alignment,
                radials_compass_point: grid.radials.compass_point,
                radials_order: grid.radials.order,
                radials_font: grid.radials.font_name.clone(),
                radials_font_size: grid.radials.font_size,
                radials_sector_lock: grid.radials.sector_lock,
                radials_visible: grid.radials.visible,
                radials_is_percent: grid.radials.is_percent,
                radials_ticks: grid.radials.ticks,
                radials_minor_ticks: grid.radials.minor_ticks,
                radials_labels: grid.radials.labels,
            }),
            Layer::Data(data) => LayerDetailRecord::Data(LayerDataRecord {
                layer_id,
                dataset: data.dataset_id,
                plot_type: data.plot_type,
                total_count: data.total_count,
                dot_radius: data.dot_radius,
            }),
        };

        StorageLayers { base, detail }
    }

    /// Construct the domain layer for a base row and its detail row.
    ///
    /// Dispatches on the base row's discriminator. A detail row of another
    /// kind is a reconstruction error.
    pub fn create_layer(&self, base: &LayerRecord, detail: LayerDetailRecord) -> Result<Layer> {
        let kind: LayerKind = base.layer_type.parse()?;
        let properties = LayerProperties {
            visible: base.visible,
            active: base.active,
            bi_directional: base.bi_directional,
            name: base.name.clone(),
            line_weight: base.line_weight,
            max_count: base.max_count,
            max_percent: base.max_percent,
            stroke: self.resolve(base.stroke_color_id, DEFAULT_STROKE),
            fill: self.resolve(base.fill_color_id, DEFAULT_FILL),
        };

        let layer = match (kind, detail) {
            (LayerKind::Text, LayerDetailRecord::Text(r)) => Layer::Text(TextLayer {
                properties,
                contents: encoding::decode_text(&r.contents),
                rect: TextRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                },
            }),
            (LayerKind::LineArrow, LayerDetailRecord::LineArrow(r)) => {
                Layer::LineArrow(LineArrowLayer {
                    properties,
                    dataset_id: r.dataset,
                    arrow_size: r.arrow_size,
                    vector_type: r.vector_type,
                    arrow_type: r.arrow_type,
                    show_vector: r.show_vector,
                    show_error: r.show_error,
                })
            }
            (LayerKind::Core, LayerDetailRecord::Core(r)) => Layer::Core(CoreLayer {
                properties,
                radius: r.radius,
                core_type: r.core_type,
            }),
            (LayerKind::Grid, LayerDetailRecord::Grid(r)) => Layer::Grid(GridLayer {
                properties,
                rings: GridRings {
                    is_fixed_count: r.rings_is_fixed_count,
                    visible: r.rings_visible,
                    show_labels: r.rings_labels,
                    fixed_count: r.rings_fixed_count,
                    count_increment: r.rings_count_increment,
                    percent_increment: r.rings_percent_increment,
                    label_angle: r.rings_label_angle,
                    font_name: r.rings_font_name,
                    font_size: r.rings_font_size,
                },
                radials: GridRadials {
                    count: r.radials_count,
                    angle: r.radials_angle,
                    label_alignment: r.radials_label_align,
                    compass_point: r.radials_compass_point,
                    order: r.radials_order,
                    font_name: r.radials_font,
                    font_size: r.radials_font_size,
                    sector_lock: r.radials_sector_lock,
                    visible: r.radials_visible,
                    is_percent: r.radials_is_percent,
                    ticks: r.radials_ticks,
                    minor_ticks: r.radials_minor_ticks,
                    labels: r.radials_labels,
                },
            }),
            (LayerKind::Data, LayerDetailRecord::Data(r)) => Layer::Data(DataLayer {
                properties,
                dataset_id: r.dataset,
                plot_type: r.plot_type,
                total_count: r.total_count,
                dot_radius: r.dot_radius,
            }),
            (kind, detail) => {
                return Err(Error::Reconstruction(format!(
                    "layer {} of type {} paired with a {} detail row",
                    base.layer_id,
                    kind,
                    detail.kind()
                )));
            }
        };

        Ok(layer)
    }

    // ========== Datasets ==========

    pub fn storage_data_set(&self, data_set: &DataSet) -> DataSetRecord {
        DataSetRecord {
            id: data_set.id,
            name: data_set.name.clone(),
            table_name: data_set.table_name.clone(),
            column_name: data_set.column_name.clone(),
            predicate: data_set.predicate.clone(),
            comments: data_set.comments.as_deref().map(encoding::encode_text),
        }
    }

    /// Build a dataset without values
    pub fn create_data_set(&self, record: DataSetRecord) -> DataSet {
        DataSet {
            id: record.id,
            comments: encoding::decode_comments(record.comments.as_deref()),
            name: record.name,
            table_name: record.table_name,
            column_name: record.column_name,
            predicate: record.predicate,
            values: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_dedup() {
        let mut factory = StorageModelFactory::new();
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);

        assert_eq!(factory.palette_id(Rgba::BLACK), 1);
        assert_eq!(factory.palette_id(red), 2);
        assert_eq!(factory.palette_id(Rgba::BLACK), 1);
        assert_eq!(factory.colors().len(), 2);
        assert_eq!(factory.color(2), Some(red));
    }

    #[test]
    fn test_unknown_color_ids_fall_back() {
        let factory = StorageModelFactory::new();
        let mut layer = Layer::grid("Grid");
        layer.properties_mut().fill = Rgba::new(0.0, 0.5, 0.0, 1.0);

        let mut writer = StorageModelFactory::new();
        let mut rows = writer.storage_layers(&layer, 0);
        rows.base.stroke_color_id = Some(42);
        rows.base.fill_color_id = None;

        let restored = factory.create_layer(&rows.base, rows.detail).unwrap();
        assert_eq!(restored.properties().stroke, DEFAULT_STROKE);
        assert_eq!(restored.properties().fill, DEFAULT_FILL);
    }

    #[test]
    fn test_storage_layers_tags_and_ids() {
        let mut factory = StorageModelFactory::new();
        let rows = factory.storage_layers(&Layer::data("Strikes", 5), 3);

        assert_eq!(rows.base.layer_id, 3);
        assert_eq!(rows.base.layer_type, "Data");
        assert_eq!(rows.detail.layer_id(), 3);
        assert_eq!(rows.detail.kind(), LayerKind::Data);
    }

    #[test]
    fn test_mismatched_detail_is_reconstruction_error() {
        let mut factory = StorageModelFactory::new();
        let grid = factory.storage_layers(&Layer::grid("Grid"), 0);
        let core = factory.storage_layers(&Layer::core("Core", 0.2), 1);

        let err = factory.create_layer(&grid.base, core.detail).unwrap_err();
        assert!(matches!(err, Error::Reconstruction(_)));

        let mut unknown = grid.base.clone();
        unknown.layer_type = "Petal".to_string();
        let err = factory.create_layer(&unknown, grid.detail).unwrap_err();
        assert!(matches!(err, Error::Reconstruction(_)));
    }

    #[test]
    fn test_geometry_record_roundtrip() {
        let factory = StorageModelFactory::new();
        let controller = GeometryController {
            is_equal_area: true,
            sector_count: 18,
            sector_size: 20.0,
            ..GeometryController::default()
        };

        let record = factory.storage_geometry(&controller);
        assert_eq!(factory.geometry_from(&record), controller);
    }

    #[test]
    fn test_data_set_comments_are_encoded() {
        let factory = StorageModelFactory::new();
        let data_set = DataSet::new(1, "Joints", "outcrop", "strike").with_comments("site A");

        let record = factory.storage_data_set(&data_set);
        assert_eq!(record.comments.as_deref(), Some(&b"c2l0ZSBB"[..]));
        assert_eq!(factory.create_data_set(record), data_set);
    }
}
