//! Database schema definitions
//!
//! Table and column names are the on-disk document contract. Renaming any of
//! them breaks compatibility with existing documents.

/// Statements owned by one internal table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: &'static str,
    /// Idempotent create statement
    pub create: &'static str,
    /// Insert template with positional parameters
    pub insert: &'static str,
    pub delete: &'static str,
}

/// Window size singleton
pub const WINDOW_SIZE: TableDefinition = TableDefinition {
    name: "_windowController",
    create: "CREATE TABLE IF NOT EXISTS _windowController (width FLOAT, height FLOAT)",
    insert: "INSERT INTO _windowController (width, height) VALUES (?1, ?2)",
    delete: "DELETE FROM _windowController;",
};

/// Geometry singleton
pub const GEOMETRY: TableDefinition = TableDefinition {
    name: "_geometryController",
    create: r#"
CREATE TABLE IF NOT EXISTS _geometryController (
    isEqualArea bool,
    isPercent bool,
    MAXCOUNT int,
    MAXPERCENT float,
    HOLLOWCORE float,
    SECTORSIZE float,
    STARTINGANGLE float,
    SECTORCOUNT int,
    RELATIVESIZE float
)
"#,
    insert: r#"
INSERT INTO _geometryController (isEqualArea, isPercent, MAXCOUNT, MAXPERCENT, HOLLOWCORE, SECTORSIZE, STARTINGANGLE, SECTORCOUNT, RELATIVESIZE)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
    delete: "DELETE FROM _geometryController;",
};

/// Base layer table, one row per layer of any kind
pub const LAYERS: TableDefinition = TableDefinition {
    name: "_layers",
    create: r#"
CREATE TABLE IF NOT EXISTS _layers (
    LAYERID INTEGER PRIMARY KEY AUTOINCREMENT,
    TYPE TEXT,
    VISIBLE BOOL,
    ACTIVE BOOL,
    BIDIR BOOL,
    LAYER_NAME TEXT,
    LINEWEIGHT REAL,
    MAXCOUNT INTEGER,
    MAXPERCENT REAL,
    STROKECOLORID INTEGER,
    FILLCOLORID INTEGER
)
"#,
    insert: r#"
INSERT INTO _layers (LAYERID, TYPE, VISIBLE, ACTIVE, BIDIR, LAYER_NAME, LINEWEIGHT, MAXCOUNT, MAXPERCENT, STROKECOLORID, FILLCOLORID)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#,
    delete: "DELETE FROM _layers;",
};

/// Color palette referenced by `_layers`
pub const COLORS: TableDefinition = TableDefinition {
    name: "_colors",
    create: r#"
CREATE TABLE IF NOT EXISTS _colors (
    COLORID INTEGER PRIMARY KEY AUTOINCREMENT,
    RED REAL,
    BLUE REAL,
    GREEN REAL,
    ALPHA REAL
)
"#,
    insert: "INSERT INTO _colors (COLORID, RED, BLUE, GREEN, ALPHA) VALUES (?1, ?2, ?3, ?4, ?5)",
    delete: "DELETE FROM _colors;",
};

/// Dataset definitions pointing at user tables
pub const DATASETS: TableDefinition = TableDefinition {
    name: "_datasets",
    create: r#"
CREATE TABLE IF NOT EXISTS _datasets (
    _id INTEGER PRIMARY KEY,
    NAME TEXT,
    TABLENAME TEXT,
    COLUMNNAME text,
    PREDICATE text,
    COMMENTS BLOB
)
"#,
    insert: "INSERT INTO _datasets (_id, NAME, TABLENAME, COLUMNNAME, PREDICATE, COMMENTS) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    delete: "DELETE FROM _datasets;",
};

pub const LAYER_TEXT: TableDefinition = TableDefinition {
    name: "_layerText",
    create: r#"
CREATE TABLE IF NOT EXISTS _layerText (
    LAYERID INTEGER,
    CONTENTS BLOB,
    RECT_POINT_X float,
    RECT_POINT_Y float,
    RECT_SIZE_HEIGHT float,
    RECT_SIZE_WIDTH float
)
"#,
    insert: r#"
INSERT INTO _layerText (LAYERID, CONTENTS, RECT_POINT_X, RECT_POINT_Y, RECT_SIZE_HEIGHT, RECT_SIZE_WIDTH)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
    delete: "DELETE FROM _layerText;",
};

pub const LAYER_LINE_ARROW: TableDefinition = TableDefinition {
    name: "_layerLineArrow",
    create: r#"
CREATE TABLE IF NOT EXISTS _layerLineArrow (
    LAYERID INTEGER,
    DATASET integer,
    ARROWSIZE float,
    VECTORTYPE INTEGER,
    ARROWTYPE INTEGER,
    SHOWVECTOR bool,
    SHOWERROR bool
)
"#,
    insert: r#"
INSERT INTO _layerLineArrow (LAYERID, DATASET, ARROWSIZE, VECTORTYPE, ARROWTYPE, SHOWVECTOR, SHOWERROR)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#,
    delete: "DELETE FROM _layerLineArrow;",
};

pub const LAYER_CORE: TableDefinition = TableDefinition {
    name: "_layerCore",
    create: "CREATE TABLE IF NOT EXISTS _layerCore (LAYERID INTEGER PRIMARY KEY, RADIUS REAL, TYPE BOOL)",
    insert: "INSERT INTO _layerCore (LAYERID, RADIUS, TYPE) VALUES (?1, ?2, ?3)",
    delete: "DELETE FROM _layerCore;",
};

pub const LAYER_GRID: TableDefinition = TableDefinition {
    name: "_layerGrid",
    create: r#"
CREATE TABLE IF NOT EXISTS _layerGrid (
    LAYERID INTEGER,
    RINGS_ISFIXEDCOUNT bool,
    RINGS_VISIBLE bool,
    RINGS_LABELS bool,
    RINGS_FIXEDCOUNT INTEGER,
    RINGS_COUNTINCREMENT INTEGER,
    RINGS_PERCENTINCREMENT float,
    RINGS_LABELANGLE float,
    RINGS_FONTNAME TEXT,
    RINGS_FONTSIZE float,
    RADIALS_COUNT INTEGER,
    RADIALS_ANGLE float,
    RADIALS_LABELALIGN INTEGER,
    RADIALS_COMPASSPOINT INTEGER,
    RADIALS_ORDER INTEGER,
    RADIALS_FONT TEXT,
    RADIALS_FONTSIZE float,
    RADIALS_SECTORLOCK bool,
    RADIALS_VISIBLE bool,
    RADIALS_ISPERCENT bool,
    RADIALS_TICKS bool,
    RADIALS_MINORTICKS bool,
    RADIALS_LABELS bool
)
"#,
    insert: r#"
INSERT INTO _layerGrid (
    LAYERID, RINGS_ISFIXEDCOUNT, RINGS_VISIBLE, RINGS_LABELS, RINGS_FIXEDCOUNT, RINGS_COUNTINCREMENT,
    RINGS_PERCENTINCREMENT, RINGS_LABELANGLE, RINGS_FONTNAME, RINGS_FONTSIZE, RADIALS_COUNT, RADIALS_ANGLE,
    RADIALS_LABELALIGN, RADIALS_COMPASSPOINT, RADIALS_ORDER, RADIALS_FONT, RADIALS_FONTSIZE, RADIALS_SECTORLOCK,
    RADIALS_VISIBLE, RADIALS_ISPERCENT, RADIALS_TICKS, RADIALS_MINORTICKS, RADIALS_LABELS
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
"#,
    delete: "DELETE FROM _layerGrid;",
};

pub const LAYER_DATA: TableDefinition = TableDefinition {
    name: "_layerData",
    create: r#"
CREATE TABLE IF NOT EXISTS _layerData (
    LAYERID INTEGER,
    DATASET INTEGER,
    PLOTTYPE INTEGER,
    TOTALCOUNT INTEGER,
    DOTRADIUS FLOAT
)
"#,
    insert: "INSERT INTO _layerData (LAYERID, DATASET, PLOTTYPE, TOTALCOUNT, DOTRADIUS) VALUES (?1, ?2, ?3, ?4, ?5)",
    delete: "DELETE FROM _layerData;",
};

/// The ten internal tables, in creation order
pub const ALL_TABLES: &[TableDefinition] = &[
    WINDOW_SIZE,
    GEOMETRY,
    LAYERS,
    COLORS,
    DATASETS,
    LAYER_TEXT,
    LAYER_LINE_ARROW,
    LAYER_CORE,
    LAYER_GRID,
    LAYER_DATA,
];

/// Tables cleared together when layers are replaced
pub const LAYER_TABLES: &[TableDefinition] = &[
    LAYERS,
    LAYER_TEXT,
    LAYER_LINE_ARROW,
    LAYER_CORE,
    LAYER_GRID,
    LAYER_DATA,
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.create).collect()
}

/// Names of the internal tables
pub fn internal_table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}

/// Whether `name` is one of the ten internal tables.
///
/// SQLite identifiers are case-insensitive, so is this check.
pub fn is_internal_table(name: &str) -> bool {
    ALL_TABLES.iter().any(|t| t.name.eq_ignore_ascii_case(name))
}

/// Whether `name` is a table maintained by SQLite itself
pub fn is_system_table(name: &str) -> bool {
    name.get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"))
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_internal_tables() {
        assert_eq!(ALL_TABLES.len(), 10);
        assert_eq!(all_schema_statements().len(), 10);
        for table in ALL_TABLES {
            assert!(table.create.contains("IF NOT EXISTS"), "{}", table.name);
            assert!(table.create.contains(table.name));
            assert!(table.insert.contains(table.name));
            assert_eq!(table.delete, format!("DELETE FROM {};", table.name));
        }
    }

    #[test]
    fn test_internal_table_matching() {
        assert!(is_internal_table("_layers"));
        assert!(is_internal_table("_LAYERGRID"));
        assert!(!is_internal_table("measurements"));
        assert!(is_system_table("sqlite_sequence"));
        assert!(is_system_table("SQLITE_stat1"));
        assert!(!is_system_table("sqlite"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("strike"), "\"strike\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
