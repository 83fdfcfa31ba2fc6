//! Column affinity from declared types
//!
//! Follows the SQLite rules for determining column affinity, applied in order
//! to the declared type of a column.

use serde::Serialize;

/// SQLite column affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAffinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl ColumnAffinity {
    pub fn from_declared_type(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            ColumnAffinity::Integer
        } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
            ColumnAffinity::Text
        } else if declared.contains("BLOB") || declared.trim().is_empty() {
            ColumnAffinity::Blob
        } else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB") {
            ColumnAffinity::Real
        } else {
            ColumnAffinity::Numeric
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnAffinity::Integer => "integer",
            ColumnAffinity::Text => "text",
            ColumnAffinity::Blob => "blob",
            ColumnAffinity::Real => "real",
            ColumnAffinity::Numeric => "numeric",
        }
    }

    /// Integer and floating-point columns can feed a dataset
    pub fn is_value_column(&self) -> bool {
        matches!(self, ColumnAffinity::Integer | ColumnAffinity::Real)
    }
}

impl std::fmt::Display for ColumnAffinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_rules() {
        assert_eq!(ColumnAffinity::from_declared_type("INTEGER"), ColumnAffinity::Integer);
        assert_eq!(ColumnAffinity::from_declared_type("bigint"), ColumnAffinity::Integer);
        assert_eq!(ColumnAffinity::from_declared_type("VARCHAR(20)"), ColumnAffinity::Text);
        assert_eq!(ColumnAffinity::from_declared_type("FLOAT"), ColumnAffinity::Real);
        assert_eq!(ColumnAffinity::from_declared_type("double precision"), ColumnAffinity::Real);
        assert_eq!(ColumnAffinity::from_declared_type(""), ColumnAffinity::Blob);
        assert_eq!(ColumnAffinity::from_declared_type("DECIMAL(10,5)"), ColumnAffinity::Numeric);
        assert_eq!(ColumnAffinity::from_declared_type("bool"), ColumnAffinity::Numeric);
        // "POINT" contains INT, which wins over everything else
        assert_eq!(ColumnAffinity::from_declared_type("FLOATING POINT"), ColumnAffinity::Integer);
    }

    #[test]
    fn test_value_columns() {
        assert!(ColumnAffinity::Integer.is_value_column());
        assert!(ColumnAffinity::Real.is_value_column());
        assert!(!ColumnAffinity::Text.is_value_column());
        assert!(!ColumnAffinity::Numeric.is_value_column());
        assert!(!ColumnAffinity::Blob.is_value_column());
    }
}
