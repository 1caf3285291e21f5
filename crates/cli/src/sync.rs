//! `sheetsync run | validate | periods`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use sheetsync_recon::calendar;
use sheetsync_recon::config::SyncMode;
use sheetsync_recon::engine::effective_start;
use sheetsync_recon::runner::{RunReport, TargetReport, TargetStatus};
use sheetsync_recon::{run, RunOptions, SyncConfig, SyncError};
use sheetsync_sheet_client::{resolve_api_base, resolve_token, SheetClient, ENV_TOKEN};

use crate::exit_codes::{
    EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_MISSING_TOKEN, EXIT_SOURCE_LOAD, EXIT_TARGET_FAILED,
};
use crate::CliError;

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub today: Option<NaiveDate>,
    pub dry_run: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
}

fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("sheetsync").join("sync.toml"))
        .ok_or_else(|| CliError::usage("no config path given and no user config directory found"))
}

fn load_config(path: &Path) -> Result<SyncConfig, CliError> {
    SyncConfig::from_path(path).map_err(|e| match e {
        SyncError::Io(msg) => CliError::usage(msg),
        other => CliError::new(EXIT_INVALID_CONFIG, format!("{}: {other}", path.display())),
    })
}

/// Exit code for a run-aborting engine error.
fn run_err(e: SyncError) -> CliError {
    let code = match e {
        SyncError::SourceLoad { .. } | SyncError::MissingColumn { .. } => EXIT_SOURCE_LOAD,
        SyncError::ConfigParse(_) | SyncError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        _ => EXIT_ERROR,
    };
    let err = CliError::new(code, e.to_string());
    match e {
        SyncError::SourceLoad { ref source, .. } if matches!(source.status, Some(401 | 403)) => {
            err.with_hint(format!("check {ENV_TOKEN}"))
        }
        _ => err,
    }
}

// ── run ─────────────────────────────────────────────────────────────

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = load_config(&config_path)?;

    let token = resolve_token(args.token).map_err(|e| {
        CliError::new(EXIT_MISSING_TOKEN, e.to_string())
            .with_hint(format!("set {ENV_TOKEN} or pass --token"))
    })?;
    let client = SheetClient::new(token, resolve_api_base(args.api_base))
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    log::info!("config {} against {}", config_path.display(), client.api_base());

    let opts = RunOptions {
        today: args.today.unwrap_or_else(|| chrono::Local::now().date_naive()),
        dry_run: args.dry_run,
    };
    let report = run(&client, &config, &opts).map_err(run_err)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if args.json {
        println!("{json_str}");
    }

    print_summary(&report);

    let failed = report.failed_targets();
    if failed > 0 {
        return Err(CliError::new(
            EXIT_TARGET_FAILED,
            format!("{failed} of {} target(s) failed", report.targets.len()),
        ));
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "period ending {}{}:",
        report.current_period,
        if report.dry_run { " (dry run)" } else { "" },
    );
    for target in &report.targets {
        eprintln!("  {}", target_line(target));
    }
    eprintln!(
        "{} created, {} updated across {} target(s)",
        report.total_created(),
        report.total_updated(),
        report.targets.len(),
    );
}

fn target_line(t: &TargetReport) -> String {
    let name = match t.description {
        Some(ref d) => format!("'{}' ({})", d, t.target_id),
        None => t.target_id.to_string(),
    };
    let counts = format!("{} created, {} updated", t.created, t.updated);
    let mut line = match t.status {
        TargetStatus::Synced => format!("{name} [{}]: synced, {counts}", t.mode),
        TargetStatus::UpToDate => format!("{name} [{}]: up to date", t.mode),
        TargetStatus::Planned => format!("{name} [{}]: would write {counts}", t.mode),
        TargetStatus::Skipped { ref skip } => format!("{name} [{}]: skipped ({skip})", t.mode),
        TargetStatus::Failed { ref error } => {
            format!("{name} [{}]: FAILED after {counts}: {error}", t.mode)
        }
    };
    if !t.backfill_periods.is_empty() {
        line.push_str(&format!(", {} period(s) backfilled", t.backfill_periods.len()));
    }
    if t.index_repairs > 0 {
        line.push_str(&format!(", {} index repair(s)", t.index_repairs));
    }
    line
}

// ── validate ────────────────────────────────────────────────────────

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    eprintln!(
        "{}: OK ({} source(s), {} target(s))",
        config_path.display(),
        config.sources.len(),
        config.targets.len(),
    );
    for target in &config.targets {
        let sources: Vec<String> =
            target.source_ids(&config.sources).iter().map(|id| id.to_string()).collect();
        let mut line = format!(
            "  target {} [{}] <- {}",
            target.label(),
            target.mode,
            sources.join(", "),
        );
        if target.mode == SyncMode::Snapshot {
            if let (true, Some(epoch), Some(start)) =
                (config.backfill.enabled, config.backfill.epoch, target.start)
            {
                line.push_str(&format!(", backfill from {}", effective_start(epoch, start)));
            }
        }
        eprintln!("{line}");
    }
    Ok(())
}

// ── periods ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PeriodRow {
    period_end: NaiveDate,
    index: i64,
}

pub fn cmd_periods(
    epoch: NaiveDate,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<(), CliError> {
    let from = from.unwrap_or(epoch);
    let to = to.unwrap_or_else(|| calendar::period_end(chrono::Local::now().date_naive()));
    if from > to {
        return Err(CliError::usage(format!("--from {from} is after --to {to}")));
    }

    let rows: Vec<PeriodRow> = calendar::enumerate_periods(from, to)
        .map(|period_end| PeriodRow { period_end, index: calendar::period_index(period_end, epoch) })
        .collect();

    if json {
        let json_str = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for row in &rows {
            println!("{}\t{}", row.period_end, row.index);
        }
    }
    Ok(())
}
