//! In-memory working copy of a document
//!
//! The store owns one in-memory SQLite connection. Documents move between
//! disk and memory only through whole-database backup.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, warn};

use super::factory::StorageModelFactory;
use super::reader::ReadSession;
use super::schema::{self, quote_identifier};
use super::sqlite::{self, ColumnInfo, TableSummary};
use crate::model::{DataSet, GeometryController, Layer, WindowSize};
use crate::{Error, Result};

/// Connection slot shared with the background reader.
///
/// `None` once the store is closed.
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Transient in-memory database mirroring the on-disk document format.
///
/// Writes replace whole tables (delete everything, insert again). That is not
/// safe under concurrent writers; callers serialize their writes.
pub struct InMemoryStore {
    conn: SharedConnection,
}

impl InMemoryStore {
    /// Open an empty in-memory database with every internal table
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Initialization)?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection, creating any missing internal table
    pub fn from_connection(conn: Connection) -> Result<Self> {
        sqlite::create_schema(&conn).map_err(Error::Initialization)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().map_err(|_| Error::DatabaseUnavailable)?;
        let conn = guard.as_ref().ok_or(Error::DatabaseUnavailable)?;
        f(conn)
    }

    fn with_conn_mut<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock().map_err(|_| Error::DatabaseUnavailable)?;
        let conn = guard.as_mut().ok_or(Error::DatabaseUnavailable)?;
        f(conn)
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Close the in-memory database. Every later call fails with
    /// [`Error::DatabaseUnavailable`].
    pub fn close(&self) {
        let conn = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(conn) = conn {
            if let Err((_, e)) = conn.close() {
                warn!("Failed to close in-memory store: {}", e);
            }
        }
    }

    // ========== Load & Save ==========

    /// Replace the whole in-memory content with the document at `path`
    pub fn load(&self, path: &Path) -> Result<()> {
        // Validate the handle before touching the file
        self.with_conn(|_| Ok(()))?;

        let source = sqlite::open_document_file(path, false)?;
        let result = self.with_conn_mut(|memory| sqlite::backup(&source, memory));
        sqlite::close_document_file(source, path);
        result?;

        // Documents from older versions may lack internal tables or columns
        self.with_conn(sqlite::upgrade_schema)?;
        debug!("Loaded {}", path.display());
        Ok(())
    }

    /// Overwrite the document at `path` with the whole in-memory content
    pub fn save(&self, path: &Path) -> Result<()> {
        self.with_conn(|_| Ok(()))?;

        let mut target = sqlite::open_document_file(path, true)?;
        let result = self.with_conn(|memory| sqlite::backup(memory, &mut target));
        sqlite::close_document_file(target, path);
        result?;

        debug!("Saved {}", path.display());
        Ok(())
    }

    // ========== Introspection ==========

    /// User data tables, internal and system tables excluded
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(sqlite::table_names)
    }

    pub fn table_inventory(&self) -> Result<Vec<TableSummary>> {
        self.with_conn(sqlite::table_inventory)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        self.with_conn(|conn| sqlite::row_count(conn, table))
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.with_conn(|conn| sqlite::columns(conn, table))
    }

    /// Columns of `table` usable as dataset values
    pub fn value_column_names(&self, table: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| sqlite::value_column_names(conn, table))
    }

    pub fn data_set_values(&self, data_set: &DataSet) -> Result<Vec<f64>> {
        self.with_conn(|conn| sqlite::data_set_values(conn, data_set))
    }

    // ========== Singletons ==========

    pub fn store_window_size(&self, size: &WindowSize) -> Result<()> {
        self.with_conn_mut(|conn| sqlite::replace_window_size(conn, size))
    }

    /// Stored window size, or [`Error::EmptyResult`] when none is stored
    pub fn window_size(&self) -> Result<WindowSize> {
        self.with_conn(sqlite::window_size)
    }

    pub fn store_geometry(&self, controller: &GeometryController) -> Result<()> {
        let record = StorageModelFactory::new().storage_geometry(controller);
        self.with_conn_mut(|conn| sqlite::replace_geometry(conn, &record))
    }

    /// Stored geometry, or [`Error::EmptyResult`] when none is stored
    pub fn geometry(&self) -> Result<GeometryController> {
        let record = self.with_conn(sqlite::geometry_record)?;
        Ok(StorageModelFactory::new().geometry_from(&record))
    }

    /// Apply the stored geometry onto `controller`
    pub fn configure(&self, controller: &mut GeometryController) -> Result<()> {
        let record = self.with_conn(sqlite::geometry_record)?;
        StorageModelFactory::new().configure_geometry(controller, &record);
        Ok(())
    }

    // ========== Layers ==========

    /// Replace every stored layer and the color palette
    pub fn store_layers(&self, layers: &[Layer]) -> Result<()> {
        let mut factory = StorageModelFactory::new();
        self.with_conn_mut(|conn| sqlite::replace_layers(conn, &mut factory, layers))
    }

    /// Reconstruct the stored layers in display order
    pub fn read_layers(&self) -> Result<Vec<Layer>> {
        self.with_conn(|conn| {
            let mut factory = StorageModelFactory::new();
            factory.set_colors(sqlite::colors(conn)?);
            sqlite::read_layers(conn, &factory)
        })
    }

    // ========== Datasets ==========

    pub fn store_data_sets(&self, data_sets: &[DataSet]) -> Result<()> {
        let factory = StorageModelFactory::new();
        self.with_conn_mut(|conn| sqlite::replace_data_sets(conn, &factory, data_sets))
    }

    /// Stored datasets with their values.
    ///
    /// Fails on the first dataset whose values cannot be read.
    pub fn data_sets(&self) -> Result<Vec<DataSet>> {
        self.with_conn(|conn| {
            let factory = StorageModelFactory::new();
            sqlite::data_set_records(conn)?
                .into_iter()
                .map(|record| {
                    let mut data_set = factory.create_data_set(record);
                    data_set.values = sqlite::data_set_values(conn, &data_set)?;
                    Ok(data_set)
                })
                .collect()
        })
    }

    // ========== User Tables ==========

    fn ensure_user_table(name: &str) -> Result<()> {
        if schema::is_internal_table(name) {
            return Err(Error::ReservedTable(name.to_string()));
        }
        Ok(())
    }

    fn ensure_exists(conn: &Connection, name: &str) -> Result<()> {
        if !sqlite::table_exists(conn, name)? {
            return Err(Error::TableNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn rename_table(&self, from: &str, to: &str) -> Result<()> {
        Self::ensure_user_table(from)?;
        Self::ensure_user_table(to)?;
        self.with_conn(|conn| {
            Self::ensure_exists(conn, from)?;
            conn.execute_batch(&format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_identifier(from),
                quote_identifier(to)
            ))?;
            debug!("Renamed table {} to {}", from, to);
            Ok(())
        })
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        Self::ensure_user_table(name)?;
        self.with_conn(|conn| {
            Self::ensure_exists(conn, name)?;
            conn.execute_batch(&format!("DROP TABLE {}", quote_identifier(name)))?;
            debug!("Dropped table {}", name);
            Ok(())
        })
    }

    /// Add a column to a user table. `definition` is the column definition
    /// as written after `ADD COLUMN`, e.g. `dip REAL`.
    pub fn add_column(&self, table: &str, definition: &str) -> Result<()> {
        Self::ensure_user_table(table)?;
        self.with_conn(|conn| {
            Self::ensure_exists(conn, table)?;
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_identifier(table),
                definition
            ))?;
            debug!("Added column {} to {}", definition, table);
            Ok(())
        })
    }

    /// Run raw SQL statements, typically to create and fill user tables
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    // ========== Background Read ==========

    /// Start reading the whole document on a worker thread
    pub fn read_from_store(&self) -> Result<ReadSession> {
        ReadSession::spawn(Arc::clone(&self.conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridRadials, GridRings, LayerProperties, Rgba, TextRect};

    fn sample_layers() -> Vec<Layer> {
        let mut text = Layer::text(
            "Title",
            "Joint orientations",
            TextRect { x: 10.0, y: 20.0, width: 200.0, height: 40.0 },
        );
        text.properties_mut().stroke = Rgba::new(0.2, 0.4, 0.6, 1.0);

        let grid = Layer::Grid(crate::model::GridLayer {
            properties: LayerProperties {
                bi_directional: true,
                line_weight: 0.5,
                ..LayerProperties::named("Grid")
            },
            rings: GridRings {
                is_fixed_count: true,
                fixed_count: 5,
                font_name: "Courier".to_string(),
                ..GridRings::default()
            },
            radials: GridRadials {
                count: 12,
                angle: 30.0,
                sector_lock: true,
                minor_ticks: true,
                ..GridRadials::default()
            },
        });

        let mut data = Layer::data("Petals", 1);
        if let Layer::Data(d) = &mut data {
            d.plot_type = 2;
            d.total_count = 48;
            d.dot_radius = 3.0;
        }
        data.properties_mut().fill = Rgba::new(0.9, 0.1, 0.1, 0.5);

        let mut arrow = Layer::line_arrow("Mean", 1);
        if let Layer::LineArrow(a) = &mut arrow {
            a.arrow_size = 2.5;
            a.vector_type = 1;
            a.show_error = true;
        }

        vec![Layer::core("Core", 0.1), grid, data, arrow, text]
    }

    fn populated_store() -> InMemoryStore {
        let store = InMemoryStore::new().unwrap();
        store
            .execute_batch(
                "CREATE TABLE outcrop (strike REAL, dip INTEGER, site TEXT);
                 INSERT INTO outcrop VALUES (10.5, 30, 'a'), (200, 45, 'b'), (95.25, 60, 'a');",
            )
            .unwrap();
        store
            .store_data_sets(&[DataSet::new(1, "Strikes", "outcrop", "strike").with_comments("site survey")])
            .unwrap();
        store.store_window_size(&WindowSize::new(640.0, 480.0)).unwrap();
        store.store_geometry(&GeometryController::default()).unwrap();
        store.store_layers(&sample_layers()).unwrap();
        store
    }

    #[test]
    fn test_layer_roundtrip() {
        let store = InMemoryStore::new().unwrap();
        let layers = sample_layers();

        store.store_layers(&layers).unwrap();
        assert_eq!(store.read_layers().unwrap(), layers);

        // Storing again replaces rather than appends
        store.store_layers(&layers[..2]).unwrap();
        assert_eq!(store.read_layers().unwrap(), layers[..2].to_vec());
        assert_eq!(store.row_count("_layerText").unwrap(), 0);
    }

    #[test]
    fn test_palette_is_deduplicated() {
        let store = InMemoryStore::new().unwrap();
        store.store_layers(&[Layer::grid("A"), Layer::grid("B")]).unwrap();

        // Both layers use black for stroke and fill
        assert_eq!(store.row_count("_colors").unwrap(), 1);
    }

    #[test]
    fn test_schema_creation_is_idempotent() {
        let store = populated_store();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xrose");
        store.save(&path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let reopened = InMemoryStore::from_connection(conn).unwrap();
        assert_eq!(reopened.table_inventory().unwrap(), store.table_inventory().unwrap());
    }

    #[test]
    fn test_backup_roundtrip() {
        let store = populated_store();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xrose");
        store.save(&path).unwrap();

        let fresh = InMemoryStore::new().unwrap();
        fresh.load(&path).unwrap();

        assert_eq!(fresh.table_inventory().unwrap(), store.table_inventory().unwrap());
        assert_eq!(fresh.table_names().unwrap(), vec!["outcrop"]);
        assert_eq!(fresh.read_layers().unwrap(), sample_layers());
        assert_eq!(fresh.window_size().unwrap(), WindowSize::new(640.0, 480.0));
    }

    #[test]
    fn test_save_overwrites_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xrose");
        populated_store().save(&path).unwrap();

        let empty = InMemoryStore::new().unwrap();
        empty.save(&path).unwrap();

        let fresh = InMemoryStore::new().unwrap();
        fresh.load(&path).unwrap();
        assert!(fresh.table_names().unwrap().is_empty());
        assert!(fresh.read_layers().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStore::new().unwrap();
        let err = store.load(&dir.path().join("nope.xrose")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_legacy_document_can_be_saved_again() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.xrose");
        {
            let conn = Connection::open(&legacy).unwrap();
            conn.execute_batch(
                "CREATE TABLE _layers (LAYERID INTEGER PRIMARY KEY AUTOINCREMENT, TYPE TEXT, VISIBLE BOOL, ACTIVE BOOL, BIDIR BOOL, LAYER_NAME TEXT, LINEWEIGHT REAL, MAXCOUNT INTEGER, MAXPERCENT REAL);",
            )
            .unwrap();
            sqlite::create_schema(&conn).unwrap();
            conn.execute_batch(
                "INSERT INTO _layers (LAYERID, TYPE, VISIBLE, LAYER_NAME) VALUES (0, 'Core', 1, 'Core');
                 INSERT INTO _layerCore (LAYERID, RADIUS) VALUES (0, 0.2);",
            )
            .unwrap();
        }

        let store = InMemoryStore::new().unwrap();
        store.load(&legacy).unwrap();
        let mut layers = store.read_layers().unwrap();
        assert_eq!(layers.len(), 1);

        layers.push(Layer::grid("Grid"));
        store.store_layers(&layers).unwrap();
        let resaved = dir.path().join("resaved.xrose");
        store.save(&resaved).unwrap();

        let fresh = InMemoryStore::new().unwrap();
        fresh.load(&resaved).unwrap();
        assert_eq!(fresh.read_layers().unwrap(), layers);
    }

    #[test]
    fn test_failed_load_keeps_store_usable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xrose");
        std::fs::write(&path, b"this is not a sqlite database, just some plain text").unwrap();

        let store = populated_store();
        assert!(store.load(&path).is_err());

        assert!(store.is_open());
        assert!(store.table_names().is_ok());
        store.save(&dir.path().join("after.xrose")).unwrap();
    }

    #[test]
    fn test_failed_save_keeps_store_usable() {
        let dir = tempfile::tempdir().unwrap();
        let store = populated_store();

        let unreachable = dir.path().join("missing").join("doc.xrose");
        assert!(store.save(&unreachable).is_err());

        assert_eq!(store.table_names().unwrap(), vec!["outcrop"]);
        assert_eq!(store.read_layers().unwrap(), sample_layers());
    }

    #[test]
    fn test_closed_store_is_unavailable() {
        let store = InMemoryStore::new().unwrap();
        store.close();

        assert!(!store.is_open());
        assert!(matches!(store.table_names(), Err(Error::DatabaseUnavailable)));
        assert!(matches!(
            store.store_layers(&[]),
            Err(Error::DatabaseUnavailable)
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            store.save(&dir.path().join("doc.xrose")),
            Err(Error::DatabaseUnavailable)
        ));
        // Nothing was created for the failed save
        assert!(!dir.path().join("doc.xrose").exists());
    }

    #[test]
    fn test_orphan_base_row() {
        let store = populated_store();
        store
            .execute_batch("INSERT INTO _layers (LAYERID, TYPE, LAYER_NAME) VALUES (99, 'Text', 'Orphan');")
            .unwrap();

        let err = store.read_layers().unwrap_err();
        assert!(matches!(err, Error::InvalidLayersStore { layer_id: 99, .. }));
    }

    #[test]
    fn test_geometry_singleton() {
        let store = InMemoryStore::new().unwrap();
        assert!(store.geometry().unwrap_err().is_empty_result());

        let first = GeometryController { sector_count: 18, ..GeometryController::default() };
        let second = GeometryController { sector_count: 72, is_percent: true, ..GeometryController::default() };
        store.store_geometry(&first).unwrap();
        store.store_geometry(&second).unwrap();

        assert_eq!(store.row_count("_geometryController").unwrap(), 1);
        assert_eq!(store.geometry().unwrap(), second);

        let mut controller = GeometryController::default();
        store.configure(&mut controller).unwrap();
        assert_eq!(controller.sector_count, 72);
    }

    #[test]
    fn test_data_sets_with_values() {
        let store = populated_store();
        let data_sets = store.data_sets().unwrap();

        assert_eq!(data_sets.len(), 1);
        assert_eq!(data_sets[0].values, vec![10.5, 200.0, 95.25]);
        assert_eq!(data_sets[0].comments.as_deref(), Some("site survey"));
        assert_eq!(store.value_column_names("outcrop").unwrap(), vec!["strike", "dip"]);
    }

    #[test]
    fn test_reserved_tables_reject_ddl() {
        let store = populated_store();

        assert!(matches!(store.drop_table("_layers"), Err(Error::ReservedTable(_))));
        assert!(matches!(
            store.rename_table("outcrop", "_colors"),
            Err(Error::ReservedTable(_))
        ));
        assert!(matches!(
            store.add_column("_datasets", "EXTRA TEXT"),
            Err(Error::ReservedTable(_))
        ));
        assert!(matches!(store.drop_table("missing"), Err(Error::TableNotFound(_))));
    }

    #[test]
    fn test_user_table_ddl() {
        let store = populated_store();

        store.add_column("outcrop", "azimuth REAL").unwrap();
        assert_eq!(
            store.value_column_names("outcrop").unwrap(),
            vec!["strike", "dip", "azimuth"]
        );

        store.rename_table("outcrop", "site_a").unwrap();
        assert_eq!(store.table_names().unwrap(), vec!["site_a"]);

        store.drop_table("site_a").unwrap();
        assert!(store.table_names().unwrap().is_empty());
    }
}
