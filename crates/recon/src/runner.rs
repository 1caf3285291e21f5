//! One reconciliation run: every target in config order, one at a time.
//!
//! A source that cannot be read aborts the run. Anything that goes wrong
//! with a target is recorded in its report and the run moves on.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar;
use crate::config::{SyncConfig, SyncMode, TargetConfig};
use crate::engine::{plan_target, PlanContext, SkipReason, TargetPlan};
use crate::error::SyncError;
use crate::model::{TableId, TableQuery};
use crate::service::TableService;
use crate::tracking::{collect_records, source_column_filter, SourceRecord};
use crate::writer::{write_plan, WriteOp, WriteReport};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// The run's notion of "now"; the current period is the week it falls in.
    pub today: NaiveDate,
    /// Plan every target but write nothing.
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    Synced,
    UpToDate,
    Planned,
    Skipped { skip: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target_id: TableId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mode: SyncMode,
    #[serde(flatten)]
    pub status: TargetStatus,
    pub source_records: usize,
    pub created: usize,
    pub updated: usize,
    pub index_repairs: usize,
    pub backfill_periods: Vec<NaiveDate>,
    pub duplicate_keys: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteReport>,
    /// Full operation list, kept on dry runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TargetPlan>,
}

impl TargetReport {
    fn new(target: &TargetConfig) -> Self {
        Self {
            target_id: target.id,
            description: target.description.clone(),
            mode: target.mode,
            status: TargetStatus::UpToDate,
            source_records: 0,
            created: 0,
            updated: 0,
            index_repairs: 0,
            backfill_periods: Vec::new(),
            duplicate_keys: Vec::new(),
            warnings: Vec::new(),
            write: None,
            plan: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TargetStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub engine_version: String,
    pub run_at: String,
    pub today: NaiveDate,
    pub current_period: NaiveDate,
    pub dry_run: bool,
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    pub fn failed_targets(&self) -> usize {
        self.targets.iter().filter(|t| t.is_failed()).count()
    }

    pub fn total_created(&self) -> usize {
        self.targets.iter().map(|t| t.created).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.targets.iter().map(|t| t.updated).sum()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run every target. Returns `Err` only for run-aborting failures.
pub fn run(
    service: &dyn TableService,
    config: &SyncConfig,
    opts: &RunOptions,
) -> Result<RunReport, SyncError> {
    let current_period = calendar::period_end(opts.today);
    log::info!(
        "sync run: {} target(s), today {}, current period ends {}{}",
        config.targets.len(),
        opts.today,
        current_period,
        if opts.dry_run { " (dry run)" } else { "" },
    );

    let mut targets = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        log::info!("processing target {} [{}]", target.label(), target.mode);
        // Each target reads its own copy of its sources.
        let records = load_records(service, config, target)?;
        targets.push(sync_target(service, config, target, &records, opts));
    }

    let report = RunReport {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        today: opts.today,
        current_period,
        dry_run: opts.dry_run,
        targets,
    };
    log::info!(
        "sync run complete: {} created, {} updated, {} failed target(s)",
        report.total_created(),
        report.total_updated(),
        report.failed_targets(),
    );
    Ok(report)
}

/// Pool the records of every source feeding `target`: source order, then
/// row order.
fn load_records(
    service: &dyn TableService,
    config: &SyncConfig,
    target: &TargetConfig,
) -> Result<Vec<SourceRecord>, SyncError> {
    let mut pooled = Vec::new();
    for source_id in target.source_ids(&config.sources) {
        let source = config.source(source_id).ok_or_else(|| {
            SyncError::ConfigValidation(format!("target {}: unknown source {source_id}", target.label()))
        })?;
        let query = TableQuery {
            column_ids: source_column_filter(source, &target.columns),
        };
        let table = service
            .get_table(source_id, &query)
            .map_err(|e| SyncError::SourceLoad { table_id: source_id, source: e })?;
        let records = collect_records(source, &table, &target.columns)?;
        log::info!(
            "loaded source {} '{}': {} record(s) of {} row(s)",
            source_id,
            table.name,
            records.len(),
            table.rows.len(),
        );
        pooled.extend(records);
    }
    Ok(pooled)
}

fn sync_target(
    service: &dyn TableService,
    config: &SyncConfig,
    target: &TargetConfig,
    records: &[SourceRecord],
    opts: &RunOptions,
) -> TargetReport {
    let mut report = TargetReport::new(target);
    report.source_records = records.len();

    let table = match service.get_table(target.id, &TableQuery::full()) {
        Ok(table) => table,
        Err(e) => {
            let err = SyncError::TargetLoad { table_id: target.id, source: e };
            log::error!("target {}: {err}", target.label());
            report.status = TargetStatus::Failed { error: err.to_string() };
            return report;
        }
    };
    log::debug!("target {} '{}': {} row(s)", target.id, table.name, table.rows.len());

    let ctx = PlanContext { today: opts.today, backfill: &config.backfill };
    let plan = plan_target(target, &table, records, ctx);
    report.index_repairs = plan.index_repairs;
    report.backfill_periods = plan.backfill_periods.clone();
    report.duplicate_keys = plan.duplicate_keys.clone();
    report.warnings = plan.warnings.clone();

    if let Some(ref skip) = plan.skipped {
        report.status = TargetStatus::Skipped { skip: skip.clone() };
        return report;
    }

    log::info!(
        "target {}: {} create(s), {} update(s) planned",
        target.label(),
        plan.creates.len(),
        plan.updates.len(),
    );

    if opts.dry_run {
        report.created = plan.creates.len();
        report.updated = plan.updates.len();
        report.status = TargetStatus::Planned;
        report.plan = Some(plan);
        return report;
    }
    if plan.is_empty() {
        return report;
    }

    let (write, failure) =
        write_plan(service, target.id, &plan.creates, &plan.updates, config.write.chunk_size);
    report.created = write.rows_written(WriteOp::Create);
    report.updated = write.rows_written(WriteOp::Update);
    report.status = match failure {
        Some(e) => TargetStatus::Failed { error: e.to_string() },
        None => TargetStatus::Synced,
    };
    report.write = Some(write);
    report
}
