use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::iso_date;
use crate::config::{ColumnPair, SourceConfig};
use crate::error::SyncError;
use crate::model::{CellValue, ColumnId, RowId, Table, TableId};
use crate::resolve::{ColumnIndex, ColumnRef};

/// Tracking key for one source row: `<source-table-id>_<native-row-id>`.
pub fn tracking_key(source_table_id: TableId, row_id: RowId) -> String {
    format!("{source_table_id}_{row_id}")
}

/// Identity of one snapshot instance: (tracking key, period-end ISO date).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompositeKey {
    pub tracking_key: String,
    pub period_end: String,
}

impl CompositeKey {
    pub fn new(tracking_key: impl Into<String>, period_end: NaiveDate) -> Self {
        Self {
            tracking_key: tracking_key.into(),
            period_end: iso_date(period_end),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tracking_key, self.period_end)
    }
}

/// A pooled source row, with its values aligned to the target's column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub tracking_key: String,
    /// One slot per mapping pair, `None` when the source column is absent.
    pub values: Vec<Option<CellValue>>,
}

/// Source-side column ids for a mapping, resolved against one source read.
/// Unresolvable references become `None` and that field is left out.
pub fn resolve_source_columns(
    source: &SourceConfig,
    table: &Table,
    pairs: &[ColumnPair],
) -> Vec<Option<ColumnId>> {
    let index = ColumnIndex::new(&table.columns);
    pairs
        .iter()
        .map(|pair| {
            let col = index.resolve(&pair.source);
            if col.is_none() {
                log::warn!("source {}: column {} not found; field skipped", source.label(), pair.source);
            }
            col
        })
        .collect()
}

/// Column ids to request from a source, when every reference is already an
/// id. Names need the full column list, so they disable the filter.
pub fn source_column_filter(source: &SourceConfig, pairs: &[ColumnPair]) -> Option<Vec<ColumnId>> {
    let refs = pairs.iter().map(|p| &p.source).chain(source.key_column.as_ref());
    let mut ids = Vec::new();
    for r in refs {
        match r {
            ColumnRef::ById(id) => {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
            ColumnRef::ByName(_) => return None,
        }
    }
    Some(ids)
}

/// Turn one source table read into records, in row order.
pub fn collect_records(
    source: &SourceConfig,
    table: &Table,
    pairs: &[ColumnPair],
) -> Result<Vec<SourceRecord>, SyncError> {
    let key_col = match source.key_column {
        Some(ref key) => {
            let col = ColumnIndex::new(&table.columns).resolve(key).ok_or_else(|| {
                SyncError::MissingColumn { table_id: source.id, column: key.to_string() }
            })?;
            Some(col)
        }
        None => None,
    };
    let columns = resolve_source_columns(source, table, pairs);

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if let Some(key) = key_col {
            if row.token(key).is_none() {
                continue;
            }
        }
        let values = columns
            .iter()
            .map(|col| {
                col.map(|c| row.cell(c).map_or(CellValue::Null, |cell| cell.value.clone()))
            })
            .collect();
        records.push(SourceRecord { tracking_key: tracking_key(source.id, row.id), values });
    }
    Ok(records)
}

/// Normalize a period-end cell to the composite-key form: an ISO date when
/// the cell parses as one (date-time strings are cut to the date), the raw
/// token otherwise.
pub fn period_end_token(value: &CellValue) -> Option<String> {
    let token = value.token()?;
    match crate::calendar::parse_date(&token) {
        Some(date) => Some(iso_date(date)),
        None => Some(token),
    }
}
