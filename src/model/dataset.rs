use serde::{Deserialize, Serialize};

/// A named selection of directional measurements.
///
/// Points at a user data table and one numeric column inside it, optionally
/// filtered by an SQL `WHERE` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub id: i64,
    pub name: String,
    pub table_name: String,
    pub column_name: String,
    pub predicate: Option<String>,
    pub comments: Option<String>,
    /// Column values as read from the source table
    #[serde(default)]
    pub values: Vec<f64>,
}

impl DataSet {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            predicate: None,
            comments: None,
            values: Vec::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// The filter predicate, ignoring blank strings
    pub fn active_predicate(&self) -> Option<&str> {
        self.predicate
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}
