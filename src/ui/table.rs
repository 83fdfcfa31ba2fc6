use tabled::{settings::Style, Table, Tabled};

use crate::model::{DataSet, Layer};
use crate::storage::{ColumnInfo, TableSummary};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        render(&self.rows)
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct InventoryRow {
    #[tabled(rename = "Table")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: i64,
    #[tabled(rename = "Kind")]
    kind: &'static str,
}

pub fn inventory_table(tables: &[TableSummary]) -> String {
    let rows: Vec<InventoryRow> = tables
        .iter()
        .map(|t| InventoryRow {
            name: t.name.clone(),
            rows: t.rows,
            kind: if t.internal { "internal" } else { "data" },
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Declared")]
    declared: String,
    #[tabled(rename = "Affinity")]
    affinity: String,
    #[tabled(rename = "Values")]
    usable: &'static str,
}

pub fn columns_table(columns: &[ColumnInfo]) -> String {
    let rows: Vec<ColumnRow> = columns
        .iter()
        .map(|c| ColumnRow {
            name: c.name.clone(),
            declared: c.declared_type.clone(),
            affinity: c.affinity.to_string(),
            usable: if c.affinity.is_value_column() { "yes" } else { "" },
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct LayerRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Visible")]
    visible: &'static str,
    #[tabled(rename = "Dataset")]
    dataset: String,
}

pub fn layers_table(layers: &[Layer]) -> String {
    let rows: Vec<LayerRow> = layers
        .iter()
        .enumerate()
        .map(|(index, layer)| LayerRow {
            index,
            kind: layer.kind().to_string(),
            name: layer.name().to_string(),
            visible: if layer.properties().visible { "yes" } else { "no" },
            dataset: layer.dataset_id().map(|id| id.to_string()).unwrap_or_default(),
        })
        .collect();
    render(&rows)
}

#[derive(Tabled)]
struct DataSetRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Predicate")]
    predicate: String,
    #[tabled(rename = "Values")]
    values: usize,
}

pub fn data_sets_table(data_sets: &[DataSet]) -> String {
    let rows: Vec<DataSetRow> = data_sets
        .iter()
        .map(|d| DataSetRow {
            id: d.id,
            name: d.name.clone(),
            source: format!("{}.{}", d.table_name, d.column_name),
            predicate: d.active_predicate().unwrap_or_default().to_string(),
            values: d.values.len(),
        })
        .collect();
    render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(layers_table(&[]).is_empty());
    }

    #[test]
    fn test_layers_table() {
        let table = layers_table(&[Layer::grid("Grid"), Layer::data("Petals", 3)]);
        assert!(table.contains("Grid"));
        assert!(table.contains("Petals"));
        assert!(table.contains("Dataset"));
    }

    #[test]
    fn test_data_sets_table() {
        let data_set = DataSet::new(1, "Strikes", "outcrop", "strike").with_predicate("dip > 10");
        let table = data_sets_table(&[data_set]);
        assert!(table.contains("outcrop.strike"));
        assert!(table.contains("dip > 10"));
    }
}
