//! SQLite operations on a single connection
//!
//! These functions know nothing about where the connection lives. The
//! in-memory working copy and the file handles opened for backup both go
//! through here.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

use super::affinity::ColumnAffinity;
use super::factory::StorageModelFactory;
use super::records::{ColorRecord, DataSetRecord, GeometryRecord, LayerDetailRecord, LayerRecord};
use super::schema::{self, quote_identifier};
use crate::model::{DataSet, Layer, LayerKind, WindowSize};
use crate::{Error, Result};

// ========== Schema & Backup ==========

/// Run every create statement. Safe to repeat on a populated database.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    for stmt in schema::all_schema_statements() {
        conn.execute(stmt, [])?;
    }
    Ok(())
}

/// Columns added to `_layers` after the first document version
const LAYER_COLOR_COLUMNS: [&str; 2] = ["STROKECOLORID", "FILLCOLORID"];

/// Bring a loaded document up to the current schema.
///
/// Creates missing internal tables and adds the layer color id columns that
/// older documents lack.
pub fn upgrade_schema(conn: &Connection) -> Result<()> {
    create_schema(conn)?;
    for column in LAYER_COLOR_COLUMNS {
        if !has_column(conn, schema::LAYERS.name, column)? {
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN {} INTEGER", schema::LAYERS.name, column),
                [],
            )?;
            debug!("Added {} to {}", column, schema::LAYERS.name);
        }
    }
    Ok(())
}

/// Pages copied per backup step. Large enough to finish in a single step.
const BACKUP_PAGES_PER_STEP: i32 = i32::MAX;

/// Copy every page of `src` into `dst`, replacing its whole content
pub fn backup(src: &Connection, dst: &mut Connection) -> Result<()> {
    let backup = Backup::new(src, dst).map_err(Error::Backup)?;
    backup
        .run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)
        .map_err(Error::Backup)
}

/// Open a file-backed handle for one backup.
///
/// With `create` unset the file must already exist and is opened read-only.
pub fn open_document_file(path: &Path, create: bool) -> Result<Connection> {
    let conn = if create {
        Connection::open(path)?
    } else {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    };
    Ok(conn)
}

/// Close a file-backed handle. Failures are logged, never returned.
pub fn close_document_file(conn: Connection, path: &Path) {
    if let Err((_, e)) = conn.close() {
        warn!("Failed to close {}: {}", path.display(), e);
    }
}

// ========== Catalog & Introspection ==========

/// Every table in catalog order, system tables excluded
pub fn all_table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(names.into_iter().filter(|n| !schema::is_system_table(n)).collect())
}

/// User data tables: everything except internal and system tables
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    Ok(all_table_names(conn)?
        .into_iter()
        .filter(|n| !schema::is_internal_table(n))
        .collect())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn row_count(conn: &Connection, table: &str) -> Result<i64> {
    if !table_exists(conn, table)? {
        return Err(Error::TableNotFound(table.to_string()));
    }
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// One entry of a table inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: i64,
    pub internal: bool,
}

/// Every non-system table with its row count
pub fn table_inventory(conn: &Connection) -> Result<Vec<TableSummary>> {
    all_table_names(conn)?
        .into_iter()
        .map(|name| {
            Ok(TableSummary {
                rows: row_count(conn, &name)?,
                internal: schema::is_internal_table(&name),
                name,
            })
        })
        .collect()
}

/// Column metadata of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub affinity: ColumnAffinity,
}

pub fn columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| {
            let name: String = row.get(0)?;
            let declared_type: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
            Ok(ColumnInfo {
                affinity: ColumnAffinity::from_declared_type(&declared_type),
                name,
                declared_type,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if columns.is_empty() {
        return Err(Error::TableNotFound(table.to_string()));
    }
    Ok(columns)
}

/// Columns whose declared affinity is integer or floating point
pub fn value_column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    Ok(columns(conn, table)?
        .into_iter()
        .filter(|c| c.affinity.is_value_column())
        .map(|c| c.name)
        .collect())
}

pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

// ========== Dataset Values ==========

fn numeric_value(value: ValueRef<'_>, data_set: &DataSet) -> Result<f64> {
    let unknown = |found: &str| Error::UnknownValueType {
        table: data_set.table_name.clone(),
        column: data_set.column_name.clone(),
        found: found.to_string(),
    };

    match value {
        ValueRef::Integer(i) => Ok(i as f64),
        ValueRef::Real(f) => Ok(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok())
            .ok_or_else(|| unknown("text")),
        ValueRef::Null => Err(unknown("null")),
        ValueRef::Blob(_) => Err(unknown("blob")),
    }
}

/// Run the dataset's query and coerce every value to a float
pub fn data_set_values(conn: &Connection, data_set: &DataSet) -> Result<Vec<f64>> {
    let mut sql = format!(
        "SELECT {} FROM {}",
        quote_identifier(&data_set.column_name),
        quote_identifier(&data_set.table_name)
    );
    if let Some(predicate) = data_set.active_predicate() {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(numeric_value(row.get_ref(0)?, data_set)?);
    }
    Ok(values)
}

// ========== Window Size & Geometry ==========

pub fn replace_window_size(conn: &mut Connection, size: &WindowSize) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(schema::WINDOW_SIZE.delete)?;
    tx.execute(schema::WINDOW_SIZE.insert, rusqlite::params![size.width, size.height])?;
    tx.commit()?;
    debug!("Stored window size {}x{}", size.width, size.height);
    Ok(())
}

pub fn window_size(conn: &Connection) -> Result<WindowSize> {
    conn.query_row("SELECT width, height FROM _windowController LIMIT 1", [], |row| {
        Ok(WindowSize {
            width: row.get::<_, Option<f64>>(0)?.unwrap_or_default(),
            height: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
        })
    })
    .optional()?
    .ok_or(Error::EmptyResult(schema::WINDOW_SIZE.name))
}

pub fn replace_geometry(conn: &mut Connection, record: &GeometryRecord) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(schema::GEOMETRY.delete)?;
    record.insert(&tx)?;
    tx.commit()?;
    debug!("Stored geometry ({} sectors)", record.sector_count);
    Ok(())
}

pub fn geometry_record(conn: &Connection) -> Result<GeometryRecord> {
    conn.query_row(GeometryRecord::SELECT, [], GeometryRecord::from_row)
        .optional()?
        .ok_or(Error::EmptyResult(schema::GEOMETRY.name))
}

// ========== Layers & Colors ==========

/// Replace the base layer table, the five detail tables and the palette.
///
/// Layers are written in display order; the palette collected while
/// converting them is written last.
pub fn replace_layers(
    conn: &mut Connection,
    factory: &mut StorageModelFactory,
    layers: &[Layer],
) -> Result<()> {
    factory.clear_colors();

    let tx = conn.transaction()?;
    for table in schema::LAYER_TABLES {
        tx.execute_batch(table.delete)?;
    }
    tx.execute_batch(schema::COLORS.delete)?;

    for (index, layer) in layers.iter().enumerate() {
        let rows = factory.storage_layers(layer, index);
        rows.base.insert(&tx)?;
        rows.detail.insert(&tx)?;
    }
    for color in factory.colors() {
        color.insert(&tx)?;
    }
    tx.commit()?;

    debug!(
        "Stored {} layers with {} palette colors",
        layers.len(),
        factory.colors().len()
    );
    Ok(())
}

pub fn colors(conn: &Connection) -> Result<Vec<ColorRecord>> {
    Ok(ColorRecord::load_all(conn)?)
}

/// Base layer rows ordered by id.
///
/// Older documents have no color id columns; those read as NULL.
pub fn layer_records(conn: &Connection) -> Result<Vec<LayerRecord>> {
    let color_column = |column: &str| -> Result<String> {
        Ok(if has_column(conn, schema::LAYERS.name, column)? {
            column.to_string()
        } else {
            format!("NULL AS {}", column)
        })
    };

    let sql = format!(
        "SELECT LAYERID, TYPE, VISIBLE, ACTIVE, BIDIR, LAYER_NAME, LINEWEIGHT, MAXCOUNT, MAXPERCENT, {}, {} FROM _layers ORDER BY LAYERID",
        color_column("STROKECOLORID")?,
        color_column("FILLCOLORID")?
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map([], LayerRecord::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Reconstruct every layer from the base table and the detail tables.
///
/// `factory` must already hold the palette. Each base row needs exactly one
/// detail row with the same id in the table its type selects; anything else
/// fails the whole read.
pub fn read_layers(conn: &Connection, factory: &StorageModelFactory) -> Result<Vec<Layer>> {
    let mut groups: HashMap<LayerKind, HashMap<i64, Vec<LayerDetailRecord>>> = HashMap::new();
    for kind in LayerKind::all() {
        let group = groups.entry(*kind).or_default();
        for record in LayerDetailRecord::load_all(conn, *kind)? {
            group.entry(record.layer_id()).or_default().push(record);
        }
    }

    let mut layers = Vec::new();
    for base in layer_records(conn)? {
        let mut matches = base
            .layer_type
            .parse::<LayerKind>()
            .ok()
            .and_then(|kind| groups.get_mut(&kind))
            .and_then(|group| group.remove(&base.layer_id))
            .unwrap_or_default();

        let detail = match (matches.pop(), matches.is_empty()) {
            (Some(detail), true) => detail,
            _ => {
                return Err(Error::InvalidLayersStore {
                    layer_id: base.layer_id,
                    layer_type: base.layer_type,
                });
            }
        };
        layers.push(factory.create_layer(&base, detail)?);
    }

    debug!("Read {} layers", layers.len());
    Ok(layers)
}

// ========== Datasets ==========

pub fn replace_data_sets(
    conn: &mut Connection,
    factory: &StorageModelFactory,
    data_sets: &[DataSet],
) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(schema::DATASETS.delete)?;
    for data_set in data_sets {
        factory.storage_data_set(data_set).insert(&tx)?;
    }
    tx.commit()?;
    debug!("Stored {} datasets", data_sets.len());
    Ok(())
}

pub fn data_set_records(conn: &Connection) -> Result<Vec<DataSetRecord>> {
    Ok(DataSetRecord::load_all(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_table_names_exclude_internal_tables() {
        let conn = connection();
        conn.execute_batch(
            "CREATE TABLE outcrop (strike REAL, dip REAL);
             CREATE TABLE faults (id INTEGER PRIMARY KEY AUTOINCREMENT, azimuth INTEGER);
             INSERT INTO faults (azimuth) VALUES (10);",
        )
        .unwrap();

        // AUTOINCREMENT creates sqlite_sequence
        assert!(table_exists(&conn, "sqlite_sequence").unwrap());
        assert_eq!(table_names(&conn).unwrap(), vec!["outcrop", "faults"]);
        assert_eq!(all_table_names(&conn).unwrap().len(), 12);
    }

    #[test]
    fn test_value_column_names() {
        let conn = connection();
        conn.execute_batch("CREATE TABLE outcrop (site TEXT, strike REAL, dip INTEGER, note, weight NUMERIC)")
            .unwrap();

        assert_eq!(value_column_names(&conn, "outcrop").unwrap(), vec!["strike", "dip"]);
        assert!(matches!(
            value_column_names(&conn, "missing"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn test_numeric_coercion() {
        let conn = connection();
        conn.execute_batch(
            "CREATE TABLE samples (untyped, boxed REAL, label TEXT);
             INSERT INTO samples VALUES ('3.5', 3.5, 'north');",
        )
        .unwrap();

        let text = DataSet::new(1, "text", "samples", "untyped");
        let boxed = DataSet::new(2, "boxed", "samples", "boxed");
        let label = DataSet::new(3, "label", "samples", "label");

        assert_eq!(data_set_values(&conn, &text).unwrap(), vec![3.5]);
        assert_eq!(data_set_values(&conn, &boxed).unwrap(), vec![3.5]);
        assert!(matches!(
            data_set_values(&conn, &label),
            Err(Error::UnknownValueType { .. })
        ));
    }

    #[test]
    fn test_blob_value_is_unknown_type() {
        let conn = connection();
        conn.execute_batch("CREATE TABLE samples (v); INSERT INTO samples VALUES (x'0102');")
            .unwrap();

        let err = data_set_values(&conn, &DataSet::new(1, "v", "samples", "v")).unwrap_err();
        match err {
            Error::UnknownValueType { found, .. } => assert_eq!(found, "blob"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_data_set_predicate() {
        let conn = connection();
        conn.execute_batch(
            "CREATE TABLE outcrop (strike REAL, site TEXT);
             INSERT INTO outcrop VALUES (10, 'a'), (20, 'b'), (30, 'a');",
        )
        .unwrap();

        let all = DataSet::new(1, "all", "outcrop", "strike").with_predicate("  ");
        let site_a = DataSet::new(2, "a", "outcrop", "strike").with_predicate("site = 'a'");

        assert_eq!(data_set_values(&conn, &all).unwrap(), vec![10.0, 20.0, 30.0]);
        assert_eq!(data_set_values(&conn, &site_a).unwrap(), vec![10.0, 30.0]);
    }

    #[test]
    fn test_singleton_replace() {
        let mut conn = connection();
        assert!(window_size(&conn).unwrap_err().is_empty_result());

        replace_window_size(&mut conn, &WindowSize::new(800.0, 600.0)).unwrap();
        replace_window_size(&mut conn, &WindowSize::new(1024.0, 768.0)).unwrap();

        assert_eq!(row_count(&conn, "_windowController").unwrap(), 1);
        assert_eq!(window_size(&conn).unwrap(), WindowSize::new(1024.0, 768.0));
    }

    #[test]
    fn test_grid_layer_scenario() {
        let conn = connection();
        conn.execute_batch(
            "INSERT INTO _layers (LAYERID, TYPE, VISIBLE, LAYER_NAME) VALUES (7, 'Grid', 1, 'Grid');
             INSERT INTO _layerGrid (LAYERID, RADIALS_COUNT) VALUES (7, 12);",
        )
        .unwrap();

        let layers = read_layers(&conn, &StorageModelFactory::new()).unwrap();
        assert_eq!(layers.len(), 1);
        match &layers[0] {
            Layer::Grid(grid) => assert_eq!(grid.radials.count, 12),
            other => panic!("expected grid layer, got {:?}", other),
        }

        conn.execute_batch("DELETE FROM _layerGrid;").unwrap();
        assert!(matches!(
            read_layers(&conn, &StorageModelFactory::new()),
            Err(Error::InvalidLayersStore { layer_id: 7, .. })
        ));
    }

    #[test]
    fn test_detail_row_in_wrong_table_is_invalid() {
        let conn = connection();
        conn.execute_batch(
            "INSERT INTO _layers (LAYERID, TYPE) VALUES (1, 'Core');
             INSERT INTO _layerData (LAYERID) VALUES (1);",
        )
        .unwrap();

        assert!(matches!(
            read_layers(&conn, &StorageModelFactory::new()),
            Err(Error::InvalidLayersStore { .. })
        ));
    }

    #[test]
    fn test_duplicate_detail_rows_are_invalid() {
        let conn = connection();
        conn.execute_batch(
            "INSERT INTO _layers (LAYERID, TYPE) VALUES (1, 'Data');
             INSERT INTO _layerData (LAYERID, DATASET) VALUES (1, 1), (1, 2);",
        )
        .unwrap();

        assert!(matches!(
            read_layers(&conn, &StorageModelFactory::new()),
            Err(Error::InvalidLayersStore { .. })
        ));
    }

    #[test]
    fn test_legacy_layers_without_color_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE _layers (LAYERID INTEGER PRIMARY KEY AUTOINCREMENT, TYPE TEXT, VISIBLE BOOL, ACTIVE BOOL, BIDIR BOOL, LAYER_NAME TEXT, LINEWEIGHT REAL, MAXCOUNT INTEGER, MAXPERCENT REAL);
             INSERT INTO _layers (LAYERID, TYPE, LAYER_NAME) VALUES (0, 'Core', 'Core');",
        )
        .unwrap();
        create_schema(&conn).unwrap();
        conn.execute("INSERT INTO _layerCore (LAYERID, RADIUS) VALUES (0, 0.25)", [])
            .unwrap();

        let layers = read_layers(&conn, &StorageModelFactory::new()).unwrap();
        assert_eq!(layers[0].properties().fill, crate::model::Rgba::WHITE);
        match &layers[0] {
            Layer::Core(core) => assert_eq!(core.radius, 0.25),
            other => panic!("expected core layer, got {:?}", other),
        }
    }

    #[test]
    fn test_upgrade_adds_layer_color_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE _layers (LAYERID INTEGER PRIMARY KEY AUTOINCREMENT, TYPE TEXT, VISIBLE BOOL, ACTIVE BOOL, BIDIR BOOL, LAYER_NAME TEXT, LINEWEIGHT REAL, MAXCOUNT INTEGER, MAXPERCENT REAL);",
        )
        .unwrap();

        upgrade_schema(&conn).unwrap();
        upgrade_schema(&conn).unwrap();

        assert!(has_column(&conn, "_layers", "STROKECOLORID").unwrap());
        assert!(has_column(&conn, "_layers", "FILLCOLORID").unwrap());
        assert!(table_exists(&conn, "_layerGrid").unwrap());
    }

    #[test]
    fn test_backup_between_connections() {
        let conn = connection();
        conn.execute_batch("CREATE TABLE outcrop (strike REAL); INSERT INTO outcrop VALUES (1), (2);")
            .unwrap();

        let mut copy = Connection::open_in_memory().unwrap();
        backup(&conn, &mut copy).unwrap();

        assert_eq!(table_inventory(&copy).unwrap(), table_inventory(&conn).unwrap());
        assert_eq!(row_count(&copy, "outcrop").unwrap(), 2);
    }

    #[test]
    fn test_open_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xrose");
        assert!(matches!(
            open_document_file(&path, false),
            Err(Error::FileNotFound(_))
        ));
    }
}
