//! Document facade
//!
//! A `Document` pairs an [`InMemoryStore`] with the model the UI edits. The
//! model is filled by a background read after loading and written back into
//! the store before saving.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::model::{DataSet, GeometryController, Layer, WindowSize};
use crate::storage::{ColumnInfo, InMemoryStore, StoreDelegate, TableSummary};
use crate::{Error, Result};

pub struct Document {
    store: InMemoryStore,
    path: Option<PathBuf>,
    table_names: Vec<String>,
    window_size: WindowSize,
    geometry: GeometryController,
    data_sets: Vec<DataSet>,
    layers: Vec<Layer>,
}

impl Document {
    /// New untitled document with an empty store
    pub fn new() -> Result<Self> {
        Ok(Self {
            store: InMemoryStore::new()?,
            path: None,
            table_names: Vec::new(),
            window_size: WindowSize::default(),
            geometry: GeometryController::default(),
            data_sets: Vec::new(),
            layers: Vec::new(),
        })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let mut document = Self::new()?;
        document.load(path)?;
        Ok(document)
    }

    /// Replace the store content and the model with the document at `path`
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.store.load(path)?;
        self.reset_model();

        let session = self.store.read_from_store()?;
        session.dispatch(&mut *self)?;

        self.path = Some(path.to_path_buf());
        info!(
            "Opened {} ({} tables, {} datasets, {} layers)",
            path.display(),
            self.table_names.len(),
            self.data_sets.len(),
            self.layers.len()
        );
        Ok(())
    }

    /// Write the model into the store and back it up to `path`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.store.store_geometry(&self.geometry)?;
        self.store.store_data_sets(&self.data_sets)?;
        self.store.store_layers(&self.layers)?;
        self.store.save(path)?;

        self.path = Some(path.to_path_buf());
        info!("Saved {}", path.display());
        Ok(())
    }

    fn reset_model(&mut self) {
        self.table_names.clear();
        self.window_size = WindowSize::default();
        self.geometry = GeometryController::default();
        self.data_sets.clear();
        self.layers.clear();
    }

    /// Refresh the cached user table names from the store
    fn refresh_table_names(&mut self) -> Result<()> {
        self.table_names = self.store.table_names()?;
        Ok(())
    }

    // ========== Accessors ==========

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn table_names(&self) -> &[String] {
        &self.table_names
    }

    pub fn window_size(&self) -> WindowSize {
        self.window_size
    }

    /// Store the window size immediately
    pub fn set_window_size(&mut self, size: WindowSize) -> Result<()> {
        self.store.store_window_size(&size)?;
        self.window_size = size;
        Ok(())
    }

    pub fn geometry(&self) -> &GeometryController {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryController {
        &mut self.geometry
    }

    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    pub fn data_set(&self, id: i64) -> Option<&DataSet> {
        self.data_sets.iter().find(|d| d.id == id)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn table_inventory(&self) -> Result<Vec<TableSummary>> {
        self.store.table_inventory()
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.store.columns(table)
    }

    /// User tables no dataset reads from
    pub fn orphaned_tables(&self) -> Vec<String> {
        let mut orphaned: Vec<String> = self
            .table_names
            .iter()
            .filter(|t| {
                !self
                    .data_sets
                    .iter()
                    .any(|d| d.table_name.eq_ignore_ascii_case(t))
            })
            .cloned()
            .collect();
        orphaned.sort();
        orphaned
    }

    /// Columns of `table` that may back a dataset
    pub fn possible_column_names(&self, table: &str) -> Result<Vec<String>> {
        self.store.value_column_names(table)
    }

    // ========== Editing ==========

    /// Add a dataset over `table.column`, reading its values now.
    ///
    /// Returns the id of the new dataset.
    pub fn add_data_set(
        &mut self,
        name: &str,
        table: &str,
        column: &str,
        predicate: Option<&str>,
    ) -> Result<i64> {
        let id = self.data_sets.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        let mut data_set = DataSet::new(id, name, table, column);
        if let Some(predicate) = predicate {
            data_set = data_set.with_predicate(predicate);
        }
        data_set.values = self.store.data_set_values(&data_set)?;
        self.data_sets.push(data_set);
        Ok(id)
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Remove the layer at `index`, dropping datasets no layer uses anymore
    pub fn delete_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        let removed = self.layers.remove(index);

        if let Some(id) = removed.dataset_id() {
            let still_used = self.layers.iter().any(|l| l.dataset_id() == Some(id));
            if !still_used {
                self.data_sets.retain(|d| d.id != id);
                debug!("Pruned dataset {} with its last layer", id);
            }
        }
        Some(removed)
    }

    /// Rename a user table and re-point the datasets reading from it
    pub fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        self.store.rename_table(from, to)?;
        for data_set in &mut self.data_sets {
            if data_set.table_name.eq_ignore_ascii_case(from) {
                data_set.table_name = to.to_string();
            }
        }
        self.refresh_table_names()
    }

    /// Number of datasets reading from `table`
    pub fn data_sets_reading(&self, table: &str) -> usize {
        self.data_sets
            .iter()
            .filter(|d| d.table_name.eq_ignore_ascii_case(table))
            .count()
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        let used_by = self.data_sets_reading(name);
        if used_by > 0 {
            debug!("Dropping table {} still read by {} datasets", name, used_by);
        }
        self.store.drop_table(name)?;
        self.refresh_table_names()
    }

    pub fn add_column(&mut self, table: &str, definition: &str) -> Result<()> {
        self.store.add_column(table, definition)
    }

    /// Re-read the values of every dataset from the store
    pub fn reload_values(&mut self) -> Result<()> {
        for data_set in &mut self.data_sets {
            data_set.values = self.store.data_set_values(data_set)?;
        }
        Ok(())
    }

    /// Import user data by running raw SQL against the store
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.store.execute_batch(sql)?;
        self.refresh_table_names()
    }

    /// Persist to the path the document was opened from or last saved to
    pub fn save_in_place(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .ok_or(Error::Untitled)?;
        self.save(&path)
    }
}

impl StoreDelegate for Document {
    fn update_table_names(&mut self, names: Vec<String>) {
        self.table_names = names;
    }

    fn update_window_size(&mut self, size: WindowSize) {
        self.window_size = size;
    }

    fn update_geometry(&mut self, geometry: GeometryController) {
        self.geometry = geometry;
    }

    fn update_data_sets(&mut self, data_sets: Vec<DataSet>) {
        self.data_sets = data_sets;
    }

    fn update_layers(&mut self, layers: Vec<Layer>) {
        self.layers = layers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let mut document = Document::new().unwrap();
        document
            .execute(
                "CREATE TABLE outcrop (strike REAL, dip REAL, site TEXT);
                 INSERT INTO outcrop VALUES (12, 40, 'a'), (190, 35, 'b'), (15, 70, 'a');",
            )
            .unwrap();
        let id = document.add_data_set("Strikes", "outcrop", "strike", None).unwrap();
        document.add_layer(Layer::grid("Grid"));
        document.add_layer(Layer::data("Petals", id));
        document
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joints.xrose");

        let mut document = sample_document();
        document.set_window_size(WindowSize::new(900.0, 700.0)).unwrap();
        document.geometry_mut().sector_count = 18;
        document.save(&path).unwrap();

        let reopened = Document::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.table_names(), ["outcrop"]);
        assert_eq!(reopened.window_size(), WindowSize::new(900.0, 700.0));
        assert_eq!(reopened.geometry().sector_count, 18);
        assert_eq!(reopened.layers(), document.layers());
        assert_eq!(reopened.data_sets()[0].values, vec![12.0, 190.0, 15.0]);
    }

    #[test]
    fn test_load_resets_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xrose");
        Document::new().unwrap().save(&path).unwrap();

        let mut document = sample_document();
        document.load(&path).unwrap();

        assert!(document.layers().is_empty());
        assert!(document.data_sets().is_empty());
        assert!(document.table_names().is_empty());
        assert_eq!(document.window_size(), WindowSize::default());
    }

    #[test]
    fn test_rename_table_repoints_data_sets() {
        let mut document = sample_document();
        document.rename_table("outcrop", "site_a").unwrap();

        assert_eq!(document.table_names(), ["site_a"]);
        assert_eq!(document.data_sets()[0].table_name, "site_a");
        document.reload_values().unwrap();
        assert_eq!(document.data_sets()[0].values.len(), 3);
    }

    #[test]
    fn test_delete_layer_prunes_data_sets() {
        let mut document = sample_document();
        let id = document.data_sets()[0].id;
        document.add_layer(Layer::line_arrow("Mean", id));

        document.delete_layer(1).unwrap();
        assert_eq!(document.data_sets().len(), 1);

        document.delete_layer(1).unwrap();
        assert!(document.data_sets().is_empty());
        assert!(document.delete_layer(5).is_none());
    }

    #[test]
    fn test_untitled_document_cannot_save_in_place() {
        let mut document = Document::new().unwrap();
        assert!(matches!(document.save_in_place(), Err(Error::Untitled)));
    }

    #[test]
    fn test_data_sets_reading() {
        let mut document = sample_document();
        assert_eq!(document.data_sets_reading("OUTCROP"), 1);

        document.drop_table("outcrop").unwrap();
        assert!(document.table_names().is_empty());
        assert_eq!(document.data_sets_reading("unused"), 0);
    }

    #[test]
    fn test_orphaned_tables() {
        let mut document = sample_document();
        document.execute("CREATE TABLE unused (azimuth REAL);").unwrap();

        assert_eq!(document.orphaned_tables(), vec!["unused"]);
    }

    #[test]
    fn test_possible_column_names() {
        let document = sample_document();
        assert_eq!(document.possible_column_names("outcrop").unwrap(), vec!["strike", "dip"]);
    }
}
