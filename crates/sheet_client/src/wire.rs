//! JSON shapes of the Smartsheet REST API and their mapping onto the
//! engine's table model.

use serde::{Deserialize, Serialize};
use sheetsync_recon::model::{
    Cell, CellValue, CellWrite, Column, NewRow, Row, RowPosition, RowUpdate, Table,
};

// ── Reads ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetBody {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnBody>,
    #[serde(default)]
    pub rows: Vec<RowBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ColumnBody {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RowBody {
    pub id: u64,
    #[serde(default)]
    pub cells: Vec<CellBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellBody {
    pub column_id: u64,
    /// Absent on empty cells.
    #[serde(default)]
    pub value: Option<CellValue>,
}

impl From<SheetBody> for Table {
    fn from(body: SheetBody) -> Self {
        Table {
            id: body.id,
            name: body.name,
            columns: body
                .columns
                .into_iter()
                .map(|c| Column { id: c.id, title: c.title })
                .collect(),
            rows: body
                .rows
                .into_iter()
                .map(|r| Row {
                    id: r.id,
                    cells: r
                        .cells
                        .into_iter()
                        .map(|c| Cell {
                            column_id: c.column_id,
                            value: c.value.unwrap_or(CellValue::Null),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Error payload: `{"errorCode": 1006, "message": "Not Found", "refId": "…"}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Human-readable message from an error response body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error_code: Some(code), message: Some(msg) }) => {
            format!("{msg} (error {code})")
        }
        Ok(ErrorBody { message: Some(msg), .. }) => msg,
        _ if body.trim().is_empty() => "empty response".to_string(),
        _ => body.trim().to_string(),
    }
}

// ── Writes ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellOut {
    pub column_id: u64,
    pub value: serde_json::Value,
    /// Lenient parsing: the service coerces the value to the column type.
    pub strict: bool,
}

impl From<&CellWrite> for CellOut {
    fn from(cell: &CellWrite) -> Self {
        let value = match &cell.value {
            // An empty string is how the API clears a cell.
            CellValue::Null => serde_json::Value::String(String::new()),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Integer(n) => serde_json::Value::from(*n),
            CellValue::Number(n) => serde_json::Value::from(*n),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
        };
        CellOut { column_id: cell.column_id, value, strict: false }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRowOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_top: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_bottom: Option<bool>,
    pub cells: Vec<CellOut>,
}

impl From<&NewRow> for NewRowOut {
    fn from(row: &NewRow) -> Self {
        let (to_top, to_bottom) = match row.position {
            RowPosition::Top => (Some(true), None),
            RowPosition::Bottom => (None, Some(true)),
        };
        NewRowOut { to_top, to_bottom, cells: row.cells.iter().map(CellOut::from).collect() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RowUpdateOut {
    pub id: u64,
    pub cells: Vec<CellOut>,
}

impl From<&RowUpdate> for RowUpdateOut {
    fn from(update: &RowUpdate) -> Self {
        RowUpdateOut { id: update.row_id, cells: update.cells.iter().map(CellOut::from).collect() }
    }
}
