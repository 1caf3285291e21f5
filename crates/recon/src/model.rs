use serde::{Deserialize, Serialize};

pub type TableId = u64;
pub type ColumnId = u64;
pub type RowId = u64;

// ---------------------------------------------------------------------------
// Tables as read from the service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
}

/// A scalar cell value as the service returns it.
///
/// Integers are kept apart from floats so 16-digit row ids survive the
/// round trip without passing through `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Opaque comparison token. `None` for null and blank text, so a cell
    /// holding `""` and a missing cell compare equal.
    pub fn token(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Self::Integer(n) => Some(n.to_string()),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some((*n as i64).to_string())
                } else {
                    Some(n.to_string())
                }
            }
            Self::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token().is_none()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column_id: ColumnId,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn cell(&self, column_id: ColumnId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    /// Normalized token of a cell, `None` when the cell is absent or blank.
    pub fn token(&self, column_id: ColumnId) -> Option<String> {
        self.cell(column_id).and_then(|c| c.value.token())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Read options for [`crate::TableService::get_table`].
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    /// Restrict returned cells to these columns. `None` = every column.
    pub column_ids: Option<Vec<ColumnId>>,
}

impl TableQuery {
    pub fn full() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Write operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPosition {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWrite {
    pub column_id: ColumnId,
    pub value: CellValue,
}

/// A row to insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRow {
    pub position: RowPosition,
    pub cells: Vec<CellWrite>,
}

impl NewRow {
    pub fn value(&self, column_id: ColumnId) -> Option<&CellValue> {
        self.cells.iter().find(|c| c.column_id == column_id).map(|c| &c.value)
    }
}

/// A patch to an existing row. Carries only the cells that change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowUpdate {
    pub row_id: RowId,
    pub cells: Vec<CellWrite>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_text_tokens_compare_equal() {
        let n = CellValue::Integer(8891640346267524);
        let s = CellValue::Text("8891640346267524".into());
        assert_eq!(n.token(), s.token());

        let f = CellValue::Number(42.0);
        assert_eq!(f.token().as_deref(), Some("42"));
        assert_eq!(CellValue::Number(1.5).token().as_deref(), Some("1.5"));
    }

    #[test]
    fn blank_text_is_empty() {
        assert!(CellValue::Null.is_empty());
        assert!(CellValue::Text("  ".into()).is_empty());
        assert!(!CellValue::Text("x".into()).is_empty());
        assert!(!CellValue::Bool(false).is_empty());
    }

    #[test]
    fn untagged_json_keeps_large_integers_exact() {
        let v: CellValue = serde_json::from_str("8891640346267524").unwrap();
        assert_eq!(v, CellValue::Integer(8891640346267524));
        let v: CellValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, CellValue::Number(2.5));
        let v: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, CellValue::Null);
        let v: CellValue = serde_json::from_str("\"Week 1\"").unwrap();
        assert_eq!(v, CellValue::Text("Week 1".into()));
    }

    #[test]
    fn row_token_lookup() {
        let row = Row {
            id: 1,
            cells: vec![
                Cell { column_id: 10, value: CellValue::Text("a".into()) },
                Cell { column_id: 11, value: CellValue::Null },
            ],
        };
        assert_eq!(row.token(10).as_deref(), Some("a"));
        assert_eq!(row.token(11), None);
        assert_eq!(row.token(12), None);
        assert!(row.cell(11).is_some());
    }
}
