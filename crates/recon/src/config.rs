use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::SyncError;
use crate::model::{RowPosition, TableId};
use crate::resolve::ColumnRef;

/// Largest chunk the service accepts in one add/update call.
pub const MAX_CHUNK_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub sources: Vec<SourceConfig>,
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub write: WriteConfig,
}

// ---------------------------------------------------------------------------
// Backfill + write
// ---------------------------------------------------------------------------

/// Historical backfill switch and the epoch period indices count from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackfillConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub epoch: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self { chunk_size: default_chunk_size() }
    }
}

fn default_chunk_size() -> usize {
    MAX_CHUNK_SIZE
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub id: TableId,
    #[serde(default)]
    pub description: Option<String>,
    /// Natural-key column. Rows with an empty key cell are not records.
    #[serde(default)]
    pub key_column: Option<ColumnRef>,
}

impl SourceConfig {
    pub fn label(&self) -> String {
        match self.description {
            Some(ref d) => format!("'{d}' ({})", self.id),
            None => self.id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Update,
    Snapshot,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub id: TableId,
    #[serde(default)]
    pub description: Option<String>,
    pub mode: SyncMode,
    pub tracking_column: String,
    pub columns: Vec<ColumnPair>,
    #[serde(default)]
    pub generated: Option<GeneratedColumns>,
    /// Source ids feeding this target, in pooling order. Empty = all sources.
    #[serde(default)]
    pub sources: Vec<TableId>,
    #[serde(default)]
    pub position: RowPosition,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl TargetConfig {
    pub fn label(&self) -> String {
        match self.description {
            Some(ref d) => format!("'{d}' ({})", self.id),
            None => self.id.to_string(),
        }
    }

    pub fn window(&self) -> ActivationWindow {
        ActivationWindow { start: self.start, end: self.end }
    }

    /// Sources feeding this target, in config order when none are listed.
    pub fn source_ids(&self, all: &[SourceConfig]) -> Vec<TableId> {
        if self.sources.is_empty() {
            all.iter().map(|s| s.id).collect()
        } else {
            self.sources.clone()
        }
    }
}

/// One mapping pair. Each side is an id or a column title.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnPair {
    pub source: ColumnRef,
    pub target: ColumnRef,
}

/// Columns the engine fills itself rather than copying from a source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedColumns {
    #[serde(default)]
    pub period_end: Option<ColumnRef>,
    #[serde(default)]
    pub period_index: Option<ColumnRef>,
}

/// Inclusive date window; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ActivationWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, SyncError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| SyncError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, SyncError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn source(&self, id: TableId) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.sources.is_empty() {
            return Err(SyncError::ConfigValidation("at least one source is required".into()));
        }
        if self.targets.is_empty() {
            return Err(SyncError::ConfigValidation("at least one target is required".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id) {
                return Err(SyncError::ConfigValidation(format!(
                    "source {} is listed twice",
                    source.id
                )));
            }
        }

        if self.write.chunk_size == 0 || self.write.chunk_size > MAX_CHUNK_SIZE {
            return Err(SyncError::ConfigValidation(format!(
                "write.chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
                self.write.chunk_size
            )));
        }

        if self.backfill.enabled && self.backfill.epoch.is_none() {
            return Err(SyncError::ConfigValidation(
                "backfill.enabled requires backfill.epoch".into(),
            ));
        }
        if let Some(epoch) = self.backfill.epoch {
            if !crate::calendar::is_period_end(epoch) {
                log::warn!("backfill.epoch {epoch} is not a Sunday; week 0 is the week closing after it");
            }
        }

        for target in &self.targets {
            let label = target.label();

            if target.tracking_column.trim().is_empty() {
                return Err(SyncError::ConfigValidation(format!(
                    "target {label}: tracking_column is empty"
                )));
            }
            if target.columns.is_empty() {
                return Err(SyncError::ConfigValidation(format!(
                    "target {label}: no column mapping"
                )));
            }
            for source_id in &target.sources {
                if self.source(*source_id).is_none() {
                    return Err(SyncError::ConfigValidation(format!(
                        "target {label}: unknown source {source_id}"
                    )));
                }
            }
            if let (Some(start), Some(end)) = (target.start, target.end) {
                if start > end {
                    return Err(SyncError::ConfigValidation(format!(
                        "target {label}: start {start} is after end {end}"
                    )));
                }
            }

            match (target.mode, &target.generated) {
                (SyncMode::Update, Some(_)) => {
                    return Err(SyncError::ConfigValidation(format!(
                        "target {label}: generated columns require mode = \"snapshot\""
                    )));
                }
                (SyncMode::Snapshot, None)
                | (SyncMode::Snapshot, Some(GeneratedColumns { period_end: None, .. })) => {
                    return Err(SyncError::ConfigValidation(format!(
                        "target {label}: snapshot mode requires generated.period_end"
                    )));
                }
                (SyncMode::Snapshot, Some(g)) => {
                    if g.period_index.is_some() && self.backfill.epoch.is_none() {
                        return Err(SyncError::ConfigValidation(format!(
                            "target {label}: generated.period_index requires backfill.epoch"
                        )));
                    }
                }
                (SyncMode::Update, None) => {}
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
