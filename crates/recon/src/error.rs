use std::fmt;

use crate::model::TableId;
use crate::service::ServiceError;

#[derive(Debug)]
pub enum SyncError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown source, bad window, etc.).
    ConfigValidation(String),
    /// A source table could not be read. Aborts the whole run.
    SourceLoad { table_id: TableId, source: ServiceError },
    /// A target table could not be read.
    TargetLoad { table_id: TableId, source: ServiceError },
    /// A column required by the run does not exist in the live schema.
    MissingColumn { table_id: TableId, column: String },
    /// A chunk of rows was rejected by the service.
    ChunkWrite {
        table_id: TableId,
        op: &'static str,
        chunk: usize,
        source: ServiceError,
    },
    /// IO error (config file read, etc.).
    Io(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SourceLoad { table_id, source } => {
                write!(f, "cannot load source table {table_id}: {source}")
            }
            Self::TargetLoad { table_id, source } => {
                write!(f, "cannot load target table {table_id}: {source}")
            }
            Self::MissingColumn { table_id, column } => {
                write!(f, "table {table_id}: missing column '{column}'")
            }
            Self::ChunkWrite { table_id, op, chunk, source } => {
                write!(f, "table {table_id}: {op} chunk {chunk} failed: {source}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
