//! Plans the create/update operations that bring one target table in line
//! with its pooled source records.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{self, iso_date, parse_date};
use crate::config::{ActivationWindow, BackfillConfig, SyncMode, TargetConfig};
use crate::model::{CellValue, CellWrite, ColumnId, NewRow, Row, RowPosition, RowUpdate, Table, TableId};
use crate::resolve::ColumnIndex;
use crate::scan::{scan_snapshots, scan_tracking, SnapshotColumns, SnapshotIndex};
use crate::tracking::{CompositeKey, SourceRecord};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Why a target was left alone this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingTrackingColumn { column: String },
    MissingPeriodEndColumn { column: String },
    OutsideWindow { period_end: NaiveDate },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrackingColumn { column } => {
                write!(f, "tracking column '{column}' not found")
            }
            Self::MissingPeriodEndColumn { column } => {
                write!(f, "period-end column {column} not found")
            }
            Self::OutsideWindow { period_end } => {
                write!(f, "period ending {period_end} is outside the activation window")
            }
        }
    }
}

/// Operations for one target. Empty lists mean the target is up to date.
#[derive(Debug, Clone, Serialize)]
pub struct TargetPlan {
    pub target_id: TableId,
    pub mode: SyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period: Option<NaiveDate>,
    /// Past periods found incomplete and filled in by this plan.
    pub backfill_periods: Vec<NaiveDate>,
    pub creates: Vec<NewRow>,
    pub updates: Vec<RowUpdate>,
    /// Rows whose missing period index this plan fills in.
    pub index_repairs: usize,
    /// Tracking (or composite) values found on more than one target row.
    pub duplicate_keys: Vec<String>,
    pub warnings: Vec<String>,
}

impl TargetPlan {
    fn new(target: &TargetConfig) -> Self {
        Self {
            target_id: target.id,
            mode: target.mode,
            skipped: None,
            current_period: None,
            backfill_periods: Vec::new(),
            creates: Vec::new(),
            updates: Vec::new(),
            index_repairs: 0,
            duplicate_keys: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn skip(mut self, reason: SkipReason) -> Self {
        log::warn!("target {}: skipped: {reason}", self.target_id);
        self.skipped = Some(reason);
        self
    }

    fn warn(&mut self, msg: String) {
        log::warn!("target {}: {msg}", self.target_id);
        self.warnings.push(msg);
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }
}

/// Everything the planner needs besides the tables themselves.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub today: NaiveDate,
    pub backfill: &'a BackfillConfig,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Plan one target against its live table read and pooled source records.
pub fn plan_target(
    target: &TargetConfig,
    table: &Table,
    records: &[SourceRecord],
    ctx: PlanContext<'_>,
) -> TargetPlan {
    let mut plan = TargetPlan::new(target);
    let columns = ColumnIndex::new(&table.columns);

    let Some(tracking_col) = columns.id_of(&target.tracking_column) else {
        return plan.skip(SkipReason::MissingTrackingColumn {
            column: target.tracking_column.clone(),
        });
    };

    let mapped: Vec<Option<ColumnId>> = target
        .columns
        .iter()
        .map(|pair| columns.resolve(&pair.target))
        .collect();
    for (pair, col) in target.columns.iter().zip(&mapped) {
        if col.is_none() {
            plan.warn(format!("target column {} not found; field skipped", pair.target));
        }
    }

    let mapping = Mapping { tracking: tracking_col, values: mapped, position: target.position };

    match target.mode {
        SyncMode::Update => {
            let current = calendar::period_end(ctx.today);
            if !target.window().contains(current) {
                return plan.skip(SkipReason::OutsideWindow { period_end: current });
            }
            plan_update(&mut plan, &mapping, &table.rows, records);
            plan
        }
        SyncMode::Snapshot => plan_snapshot(plan, target, &columns, &mapping, &table.rows, records, ctx),
    }
}

/// Resolved target-side columns.
struct Mapping {
    tracking: ColumnId,
    /// One slot per mapping pair; `None` when the column is missing.
    values: Vec<Option<ColumnId>>,
    position: RowPosition,
}

impl Mapping {
    /// Non-empty mapped values plus the tracking stamp.
    fn new_row(&self, record: &SourceRecord) -> NewRow {
        let mut cells = Vec::with_capacity(self.values.len() + 1);
        for (col, value) in self.values.iter().zip(&record.values) {
            let (Some(col), Some(value)) = (col, value) else {
                continue;
            };
            if !value.is_empty() {
                cells.push(CellWrite { column_id: *col, value: value.clone() });
            }
        }
        cells.push(CellWrite {
            column_id: self.tracking,
            value: CellValue::Text(record.tracking_key.clone()),
        });
        NewRow { position: self.position, cells }
    }

    /// Cells whose source value differs from the row's current value.
    fn changed_cells(&self, record: &SourceRecord, row: &Row) -> Vec<CellWrite> {
        let mut cells = Vec::new();
        for (col, value) in self.values.iter().zip(&record.values) {
            let (Some(col), Some(value)) = (col, value) else {
                continue;
            };
            if value.token() != row.token(*col) {
                cells.push(CellWrite { column_id: *col, value: value.clone() });
            }
        }
        cells
    }
}

// ---------------------------------------------------------------------------
// Update mode
// ---------------------------------------------------------------------------

fn plan_update(plan: &mut TargetPlan, mapping: &Mapping, rows: &[Row], records: &[SourceRecord]) {
    let index = scan_tracking(rows, mapping.tracking);
    plan.duplicate_keys = index.duplicates.clone();
    if !index.duplicates.is_empty() {
        plan.warn(format!(
            "{} tracking value(s) appear on more than one row; the last row wins",
            index.duplicates.len()
        ));
    }

    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.tracking_key.as_str()) {
            continue;
        }
        match index.by_key.get(&record.tracking_key) {
            None => plan.creates.push(mapping.new_row(record)),
            Some(row) => {
                let cells = mapping.changed_cells(record, row);
                if !cells.is_empty() {
                    plan.updates.push(RowUpdate { row_id: row.id, cells });
                }
            }
        }
    }

    log::debug!(
        "target {}: {} record(s), {} existing row(s), {} create(s), {} update(s)",
        plan.target_id,
        records.len(),
        index.by_key.len(),
        plan.creates.len(),
        plan.updates.len(),
    );
}

// ---------------------------------------------------------------------------
// Snapshot mode
// ---------------------------------------------------------------------------

fn plan_snapshot(
    mut plan: TargetPlan,
    target: &TargetConfig,
    columns: &ColumnIndex,
    mapping: &Mapping,
    rows: &[Row],
    records: &[SourceRecord],
    ctx: PlanContext<'_>,
) -> TargetPlan {
    let current = calendar::period_end(ctx.today);
    plan.current_period = Some(current);

    let window = target.window();
    if !window.contains(current) {
        return plan.skip(SkipReason::OutsideWindow { period_end: current });
    }

    // Validation guarantees `generated.period_end` on snapshot targets.
    let generated = target.generated.as_ref();
    let Some(end_ref) = generated.and_then(|g| g.period_end.as_ref()) else {
        return plan.skip(SkipReason::MissingPeriodEndColumn { column: "(unset)".into() });
    };
    let Some(end_col) = columns.resolve(end_ref) else {
        return plan.skip(SkipReason::MissingPeriodEndColumn { column: end_ref.to_string() });
    };

    let mut index_col = None;
    if let Some(index_ref) = generated.and_then(|g| g.period_index.as_ref()) {
        match (columns.resolve(index_ref), ctx.backfill.epoch) {
            (Some(col), Some(epoch)) => index_col = Some((col, epoch)),
            (None, _) => plan.warn(format!(
                "period-index column {index_ref} not found; indices not written"
            )),
            (Some(_), None) => plan.warn("no epoch configured; indices not written".into()),
        }
    }

    let index = scan_snapshots(
        rows,
        SnapshotColumns {
            tracking: mapping.tracking,
            period_end: end_col,
            period_index: index_col.map(|(col, _)| col),
        },
    );
    if !index.duplicates.is_empty() {
        plan.duplicate_keys = index.duplicates.iter().map(|k| k.to_string()).collect();
        plan.warn(format!(
            "{} snapshot key(s) appear on more than one row; the last row wins",
            index.duplicates.len()
        ));
    }
    log::debug!(
        "target {}: {} snapshot row(s) across {} period(s)",
        plan.target_id,
        index.by_key.len(),
        index.periods.len(),
    );

    plan.backfill_periods = backfill_worklist(target, ctx.backfill, current, &index, records);
    if !plan.backfill_periods.is_empty() {
        log::info!(
            "target {}: backfilling {} incomplete period(s) from {}",
            plan.target_id,
            plan.backfill_periods.len(),
            plan.backfill_periods[0],
        );
    }

    let periods: Vec<NaiveDate> =
        plan.backfill_periods.iter().copied().chain(std::iter::once(current)).collect();

    let mut planned: HashSet<CompositeKey> = HashSet::new();
    for period in periods {
        for record in records {
            let key = CompositeKey::new(record.tracking_key.clone(), period);
            if let Some(row) = index.by_key.get(&key) {
                // Past periods are history; only the current one follows the source.
                if period == current {
                    let cells = mapping.changed_cells(record, row);
                    if !cells.is_empty() {
                        plan.updates.push(RowUpdate { row_id: row.id, cells });
                    }
                }
                continue;
            }
            if !planned.insert(key) {
                continue;
            }

            let mut new_row = mapping.new_row(record);
            new_row.cells.push(CellWrite {
                column_id: end_col,
                value: CellValue::Text(iso_date(period)),
            });
            if let Some((col, epoch)) = index_col {
                new_row.cells.push(CellWrite {
                    column_id: col,
                    value: CellValue::Integer(calendar::period_index(period, epoch)),
                });
            }
            plan.creates.push(new_row);
        }
    }

    if let Some((col, epoch)) = index_col {
        repair_index_gaps(&mut plan, &index, window, col, epoch);
    }

    plan.updates = merge_updates(std::mem::take(&mut plan.updates));
    plan
}

/// Past periods in the backfill range where fewer records have a snapshot
/// than there are source records. Oldest first; the current period is
/// never included.
fn backfill_worklist(
    target: &TargetConfig,
    backfill: &BackfillConfig,
    current: NaiveDate,
    index: &SnapshotIndex<'_>,
    records: &[SourceRecord],
) -> Vec<NaiveDate> {
    let (true, Some(epoch), Some(start)) = (backfill.enabled, backfill.epoch, target.start) else {
        return Vec::new();
    };
    let effective_start = effective_start(epoch, start);
    let Some(last) = current.pred_opt() else {
        return Vec::new();
    };

    let total = records.len();
    calendar::enumerate_periods(effective_start, last)
        .filter(|period| {
            let present = records
                .iter()
                .filter(|r| index.contains(&CompositeKey::new(r.tracking_key.clone(), *period)))
                .count();
            present < total
        })
        .collect()
}

/// Backfill begins at whichever is later: the global epoch or the target's start.
pub fn effective_start(epoch: NaiveDate, start: NaiveDate) -> NaiveDate {
    epoch.max(start)
}

fn repair_index_gaps(
    plan: &mut TargetPlan,
    index: &SnapshotIndex<'_>,
    window: ActivationWindow,
    col: ColumnId,
    epoch: NaiveDate,
) {
    for gap in &index.index_gaps {
        let Some(date) = parse_date(&gap.period_end) else {
            plan.warn(format!(
                "row {}: cannot parse period end '{}'; index not repaired",
                gap.row_id, gap.period_end
            ));
            continue;
        };
        if !window.contains(date) {
            continue;
        }
        plan.updates.push(RowUpdate {
            row_id: gap.row_id,
            cells: vec![CellWrite {
                column_id: col,
                value: CellValue::Integer(calendar::period_index(date, epoch)),
            }],
        });
        plan.index_repairs += 1;
    }
}

/// Fold updates for the same row into one, keeping first-seen order.
fn merge_updates(updates: Vec<RowUpdate>) -> Vec<RowUpdate> {
    let mut merged: Vec<RowUpdate> = Vec::with_capacity(updates.len());
    for update in updates {
        match merged.iter_mut().find(|u| u.row_id == update.row_id) {
            Some(existing) => {
                for cell in update.cells {
                    match existing.cells.iter_mut().find(|c| c.column_id == cell.column_id) {
                        Some(c) => c.value = cell.value,
                        None => existing.cells.push(cell),
                    }
                }
            }
            None => merged.push(update),
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
