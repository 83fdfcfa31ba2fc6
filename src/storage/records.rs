//! Flat storage records, one struct per internal table row
//!
//! Records mirror the columns of their table exactly. Translating them to and
//! from domain types is the job of [`StorageModelFactory`](super::factory::StorageModelFactory).

use rusqlite::types::{FromSql, ValueRef};
use rusqlite::{Connection, Row, params};

use super::schema;
use crate::model::LayerKind;

/// Read a column, treating NULL as the zero value of the field type.
///
/// Documents written by older versions leave columns they did not know yet
/// as NULL.
fn field<T: FromSql + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    Ok(row.get::<_, Option<T>>(idx)?.unwrap_or_default())
}

/// Read a blob column. Text values are accepted as their UTF-8 bytes.
fn blob_field(row: &Row, idx: usize) -> rusqlite::Result<Option<Vec<u8>>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(Some(bytes.to_vec())),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "blob".to_string(),
            other.data_type(),
        )),
    }
}

fn load_rows<T>(
    conn: &Connection,
    sql: &str,
    map: impl FnMut(&Row) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    rows.collect()
}

/// Row of `_geometryController`
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub is_equal_area: bool,
    pub is_percent: bool,
    pub max_count: i32,
    pub max_percent: f32,
    pub hollow_core: f32,
    pub sector_size: f32,
    pub starting_angle: f32,
    pub sector_count: i32,
    pub relative_size: f32,
}

impl GeometryRecord {
    pub const SELECT: &'static str = "SELECT isEqualArea, isPercent, MAXCOUNT, MAXPERCENT, HOLLOWCORE, SECTORSIZE, STARTINGANGLE, SECTORCOUNT, RELATIVESIZE FROM _geometryController LIMIT 1";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            is_equal_area: field(row, 0)?,
            is_percent: field(row, 1)?,
            max_count: field(row, 2)?,
            max_percent: field(row, 3)?,
            hollow_core: field(row, 4)?,
            sector_size: field(row, 5)?,
            starting_angle: field(row, 6)?,
            sector_count: field(row, 7)?,
            relative_size: field(row, 8)?,
        })
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::GEOMETRY.insert,
            params![
                self.is_equal_area,
                self.is_percent,
                self.max_count,
                self.max_percent,
                self.hollow_core,
                self.sector_size,
                self.starting_angle,
                self.sector_count,
                self.relative_size,
            ],
        )?;
        Ok(())
    }
}

/// Row of `_layers`, shared by every layer kind
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub layer_id: i64,
    /// Discriminator selecting the detail table
    pub layer_type: String,
    pub visible: bool,
    pub active: bool,
    pub bi_directional: bool,
    pub name: String,
    pub line_weight: f32,
    pub max_count: i32,
    pub max_percent: f32,
    pub stroke_color_id: Option<i64>,
    pub fill_color_id: Option<i64>,
}

impl LayerRecord {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            layer_type: field(row, 1)?,
            visible: field(row, 2)?,
            active: field(row, 3)?,
            bi_directional: field(row, 4)?,
            name: field(row, 5)?,
            line_weight: field(row, 6)?,
            max_count: field(row, 7)?,
            max_percent: field(row, 8)?,
            stroke_color_id: row.get(9)?,
            fill_color_id: row.get(10)?,
        })
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYERS.insert,
            params![
                self.layer_id,
                self.layer_type,
                self.visible,
                self.active,
                self.bi_directional,
                self.name,
                self.line_weight,
                self.max_count,
                self.max_percent,
                self.stroke_color_id,
                self.fill_color_id,
            ],
        )?;
        Ok(())
    }
}

/// Row of `_colors`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRecord {
    pub id: i64,
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl ColorRecord {
    pub const SELECT: &'static str = "SELECT COLORID, RED, GREEN, BLUE, ALPHA FROM _colors ORDER BY COLORID";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            red: field(row, 1)?,
            green: field(row, 2)?,
            blue: field(row, 3)?,
            alpha: field(row, 4)?,
        })
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        // Column order of the table is RED, BLUE, GREEN
        conn.execute(
            schema::COLORS.insert,
            params![self.id, self.red, self.blue, self.green, self.alpha],
        )?;
        Ok(())
    }

    pub fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        load_rows(conn, Self::SELECT, Self::from_row)
    }
}

/// Row of `_datasets`
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetRecord {
    pub id: i64,
    pub name: String,
    pub table_name: String,
    pub column_name: String,
    pub predicate: Option<String>,
    /// Encoded comment text
    pub comments: Option<Vec<u8>>,
}

impl DataSetRecord {
    pub const SELECT: &'static str =
        "SELECT _id, NAME, TABLENAME, COLUMNNAME, PREDICATE, COMMENTS FROM _datasets ORDER BY _id";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: field(row, 1)?,
            table_name: field(row, 2)?,
            column_name: field(row, 3)?,
            predicate: row.get(4)?,
            comments: blob_field(row, 5)?,
        })
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::DATASETS.insert,
            params![
                self.id,
                self.name,
                self.table_name,
                self.column_name,
                self.predicate,
                self.comments,
            ],
        )?;
        Ok(())
    }

    pub fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Self>> {
        load_rows(conn, Self::SELECT, Self::from_row)
    }
}

/// Row of `_layerText`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTextRecord {
    pub layer_id: i64,
    /// Encoded text contents
    pub contents: Vec<u8>,
    pub x: f32,
    pub y: f32,
    pub height: f32,
    pub width: f32,
}

impl LayerTextRecord {
    const SELECT: &'static str = "SELECT LAYERID, CONTENTS, RECT_POINT_X, RECT_POINT_Y, RECT_SIZE_HEIGHT, RECT_SIZE_WIDTH FROM _layerText";

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            contents: blob_field(row, 1)?.unwrap_or_default(),
            x: field(row, 2)?,
            y: field(row, 3)?,
            height: field(row, 4)?,
            width: field(row, 5)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYER_TEXT.insert,
            params![self.layer_id, self.contents, self.x, self.y, self.height, self.width],
        )?;
        Ok(())
    }
}

/// Row of `_layerLineArrow`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerLineArrowRecord {
    pub layer_id: i64,
    pub dataset: i64,
    pub arrow_size: f32,
    pub vector_type: i32,
    pub arrow_type: i32,
    pub show_vector: bool,
    pub show_error: bool,
}

impl LayerLineArrowRecord {
    const SELECT: &'static str = "SELECT LAYERID, DATASET, ARROWSIZE, VECTORTYPE, ARROWTYPE, SHOWVECTOR, SHOWERROR FROM _layerLineArrow";

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            dataset: field(row, 1)?,
            arrow_size: field(row, 2)?,
            vector_type: field(row, 3)?,
            arrow_type: field(row, 4)?,
            show_vector: field(row, 5)?,
            show_error: field(row, 6)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYER_LINE_ARROW.insert,
            params![
                self.layer_id,
                self.dataset,
                self.arrow_size,
                self.vector_type,
                self.arrow_type,
                self.show_vector,
                self.show_error,
            ],
        )?;
        Ok(())
    }
}

/// Row of `_layerCore`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCoreRecord {
    pub layer_id: i64,
    pub radius: f32,
    pub core_type: bool,
}

impl LayerCoreRecord {
    const SELECT: &'static str = "SELECT LAYERID, RADIUS, TYPE FROM _layerCore";

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            radius: field(row, 1)?,
            core_type: field(row, 2)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYER_CORE.insert,
            params![self.layer_id, self.radius, self.core_type],
        )?;
        Ok(())
    }
}

/// Row of `_layerGrid`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGridRecord {
    pub layer_id: i64,
    pub rings_is_fixed_count: bool,
    pub rings_visible: bool,
    pub rings_labels: bool,
    pub rings_fixed_count: i32,
    pub rings_count_increment: i32,
    pub rings_percent_increment: f32,
    pub rings_label_angle: f32,
    pub rings_font_name: String,
    pub rings_font_size: f32,
    pub radials_count: i32,
    pub radials_angle: f32,
    pub radials_label_align: i32,
    pub radials_compass_point: i32,
    pub radials_order: i32,
    pub radials_font: String,
    pub radials_font_size: f32,
    pub radials_sector_lock: bool,
    pub radials_visible: bool,
    pub radials_is_percent: bool,
    pub radials_ticks: bool,
    pub radials_minor_ticks: bool,
    pub radials_labels: bool,
}

impl LayerGridRecord {
    const SELECT: &'static str = r#"
SELECT LAYERID, RINGS_ISFIXEDCOUNT, RINGS_VISIBLE, RINGS_LABELS, RINGS_FIXEDCOUNT, RINGS_COUNTINCREMENT,
       RINGS_PERCENTINCREMENT, RINGS_LABELANGLE, RINGS_FONTNAME, RINGS_FONTSIZE, RADIALS_COUNT, RADIALS_ANGLE,
       RADIALS_LABELALIGN, RADIALS_COMPASSPOINT, RADIALS_ORDER, RADIALS_FONT, RADIALS_FONTSIZE, RADIALS_SECTORLOCK,
       RADIALS_VISIBLE, RADIALS_ISPERCENT, RADIALS_TICKS, RADIALS_MINORTICKS, RADIALS_LABELS
FROM _layerGrid
"#;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            rings_is_fixed_count: field(row, 1)?,
            rings_visible: field(row, 2)?,
            rings_labels: field(row, 3)?,
            rings_fixed_count: field(row, 4)?,
            rings_count_increment: field(row, 5)?,
            rings_percent_increment: field(row, 6)?,
            rings_label_angle: field(row, 7)?,
            rings_font_name: field(row, 8)?,
            rings_font_size: field(row, 9)?,
            radials_count: field(row, 10)?,
            radials_angle: field(row, 11)?,
            radials_label_align: field(row, 12)?,
            radials_compass_point: field(row, 13)?,
            radials_order: field(row, 14)?,
            radials_font: field(row, 15)?,
            radials_font_size: field(row, 16)?,
            radials_sector_lock: field(row, 17)?,
            radials_visible: field(row, 18)?,
            radials_is_percent: field(row, 19)?,
            radials_ticks: field(row, 20)?,
            radials_minor_ticks: field(row, 21)?,
            radials_labels: field(row, 22)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYER_GRID.insert,
            params![
                self.layer_id,
                self.rings_is_fixed_count,
                self.rings_visible,
                self.rings_labels,
                self.rings_fixed_count,
                self.rings_count_increment,
                self.rings_percent_increment,
                self.rings_label_angle,
                self.rings_font_name,
                self.rings_font_size,
                self.radials_count,
                self.radials_angle,
                self.radials_label_align,
                self.radials_compass_point,
                self.radials_order,
                self.radials_font,
                self.radials_font_size,
                self.radials_sector_lock,
                self.radials_visible,
                self.radials_is_percent,
                self.radials_ticks,
                self.radials_minor_ticks,
                self.radials_labels,
            ],
        )?;
        Ok(())
    }
}

/// Row of `_layerData`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDataRecord {
    pub layer_id: i64,
    pub dataset: i64,
    pub plot_type: i32,
    pub total_count: i32,
    pub dot_radius: f32,
}

impl LayerDataRecord {
    const SELECT: &'static str =
        "SELECT LAYERID, DATASET, PLOTTYPE, TOTALCOUNT, DOTRADIUS FROM _layerData";

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            layer_id: row.get(0)?,
            dataset: field(row, 1)?,
            plot_type: field(row, 2)?,
            total_count: field(row, 3)?,
            dot_radius: field(row, 4)?,
        })
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            schema::LAYER_DATA.insert,
            params![
                self.layer_id,
                self.dataset,
                self.plot_type,
                self.total_count,
                self.dot_radius,
            ],
        )?;
        Ok(())
    }
}

/// Row of one of the five layer detail tables
#[derive(Debug, Clone, PartialEq)]
pub enum LayerDetailRecord {
    Text(LayerTextRecord),
    LineArrow(LayerLineArrowRecord),
    Core(LayerCoreRecord),
    Grid(LayerGridRecord),
    Data(LayerDataRecord),
}

impl LayerDetailRecord {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerDetailRecord::Text(_) => LayerKind::Text,
            LayerDetailRecord::LineArrow(_) => LayerKind::LineArrow,
            LayerDetailRecord::Core(_) => LayerKind::Core,
            LayerDetailRecord::Grid(_) => LayerKind::Grid,
            LayerDetailRecord::Data(_) => LayerKind::Data,
        }
    }

    pub fn layer_id(&self) -> i64 {
        match self {
            LayerDetailRecord::Text(r) => r.layer_id,
            LayerDetailRecord::LineArrow(r) => r.layer_id,
            LayerDetailRecord::Core(r) => r.layer_id,
            LayerDetailRecord::Grid(r) => r.layer_id,
            LayerDetailRecord::Data(r) => r.layer_id,
        }
    }

    pub fn insert(&self, conn: &Connection) -> rusqlite::Result<()> {
        match self {
            LayerDetailRecord::Text(r) => r.insert(conn),
            LayerDetailRecord::LineArrow(r) => r.insert(conn),
            LayerDetailRecord::Core(r) => r.insert(conn),
            LayerDetailRecord::Grid(r) => r.insert(conn),
            LayerDetailRecord::Data(r) => r.insert(conn),
        }
    }

    /// Load every row of the detail table for `kind`
    pub fn load_all(conn: &Connection, kind: LayerKind) -> rusqlite::Result<Vec<Self>> {
        match kind {
            LayerKind::Text => load_rows(conn, LayerTextRecord::SELECT, |row| {
                LayerTextRecord::from_row(row).map(LayerDetailRecord::Text)
            }),
            LayerKind::LineArrow => load_rows(conn, LayerLineArrowRecord::SELECT, |row| {
                LayerLineArrowRecord::from_row(row).map(LayerDetailRecord::LineArrow)
            }),
            LayerKind::Core => load_rows(conn, LayerCoreRecord::SELECT, |row| {
                LayerCoreRecord::from_row(row).map(LayerDetailRecord::Core)
            }),
            LayerKind::Grid => load_rows(conn, LayerGridRecord::SELECT, |row| {
                LayerGridRecord::from_row(row).map(LayerDetailRecord::Grid)
            }),
            LayerKind::Data => load_rows(conn, LayerDataRecord::SELECT, |row| {
                LayerDataRecord::from_row(row).map(LayerDetailRecord::Data)
            }),
        }
    }
}
