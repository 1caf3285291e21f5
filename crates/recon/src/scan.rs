//! Inventory of what a target table already holds.

use std::collections::{BTreeSet, HashMap};

use crate::model::{ColumnId, Row, RowId};
use crate::tracking::{period_end_token, CompositeKey};

// ---------------------------------------------------------------------------
// Update mode
// ---------------------------------------------------------------------------

/// Existing target rows keyed by tracking token.
#[derive(Debug, Default)]
pub struct TrackingIndex<'a> {
    pub by_key: HashMap<String, &'a Row>,
    /// Tracking tokens seen on more than one row. The later row wins.
    pub duplicates: Vec<String>,
}

pub fn scan_tracking<'a>(rows: &'a [Row], tracking_col: ColumnId) -> TrackingIndex<'a> {
    let mut index = TrackingIndex::default();
    for row in rows {
        let Some(key) = row.token(tracking_col) else {
            continue;
        };
        if index.by_key.insert(key.clone(), row).is_some() {
            index.duplicates.push(key);
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Snapshot mode
// ---------------------------------------------------------------------------

/// Columns the snapshot scan reads.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotColumns {
    pub tracking: ColumnId,
    pub period_end: ColumnId,
    pub period_index: Option<ColumnId>,
}

/// A row carrying tracking and period-end but no period index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGap {
    pub row_id: RowId,
    pub period_end: String,
}

#[derive(Debug, Default)]
pub struct SnapshotIndex<'a> {
    pub by_key: HashMap<CompositeKey, &'a Row>,
    pub index_gaps: Vec<IndexGap>,
    pub periods: BTreeSet<String>,
    pub duplicates: Vec<CompositeKey>,
}

impl SnapshotIndex<'_> {
    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.by_key.contains_key(key)
    }
}

/// Single pass over the target rows. Rows missing either the tracking or
/// the period-end value are ignored, so a half-written row is re-created on
/// the next run.
pub fn scan_snapshots<'a>(rows: &'a [Row], cols: SnapshotColumns) -> SnapshotIndex<'a> {
    let mut index = SnapshotIndex::default();
    for row in rows {
        let Some(tracking_key) = row.token(cols.tracking) else {
            continue;
        };
        let Some(period_end) = row.cell(cols.period_end).and_then(|c| period_end_token(&c.value))
        else {
            continue;
        };

        if let Some(index_col) = cols.period_index {
            if row.token(index_col).is_none() {
                index.index_gaps.push(IndexGap { row_id: row.id, period_end: period_end.clone() });
            }
        }

        index.periods.insert(period_end.clone());
        let key = CompositeKey { tracking_key, period_end };
        if index.by_key.insert(key.clone(), row).is_some() {
            index.duplicates.push(key);
        }
    }
    index
}
