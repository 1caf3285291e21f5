//! Chunked application of a plan to one target table.
//!
//! Each chunk is its own service call and commits on its own. A failed
//! chunk stops the remaining chunks for the target; earlier chunks stay.

use serde::Serialize;

use crate::error::SyncError;
use crate::model::{NewRow, RowUpdate, TableId};
use crate::service::TableService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    Update,
    Create,
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Create => "create",
        }
    }
}

/// Outcome of one service call.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub op: WriteOp,
    /// 0-based position within its op's chunk sequence.
    pub index: usize,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    pub chunks: Vec<ChunkResult>,
    /// Chunks never sent because an earlier chunk failed.
    pub chunks_not_attempted: usize,
}

impl WriteReport {
    pub fn rows_written(&self, op: WriteOp) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.op == op && c.is_ok())
            .map(|c| c.rows)
            .sum()
    }

    pub fn failed(&self) -> bool {
        self.chunks.iter().any(|c| !c.is_ok())
    }
}

/// Sends updates, then creates, `chunk_size` rows per call.
pub fn write_plan(
    service: &dyn TableService,
    table_id: TableId,
    creates: &[NewRow],
    updates: &[RowUpdate],
    chunk_size: usize,
) -> (WriteReport, Option<SyncError>) {
    let chunk_size = chunk_size.max(1);
    let mut report = WriteReport::default();
    let total_chunks = updates.len().div_ceil(chunk_size) + creates.len().div_ceil(chunk_size);

    let mut attempt = |op: WriteOp, index: usize, rows: usize, result: Result<(), crate::ServiceError>| {
        match result {
            Ok(()) => {
                log::debug!("table {table_id}: {} chunk {index} ({rows} rows) ok", op.as_str());
                report.chunks.push(ChunkResult { op, index, rows, error: None });
                None
            }
            Err(e) => {
                report.chunks.push(ChunkResult { op, index, rows, error: Some(e.to_string()) });
                Some(SyncError::ChunkWrite { table_id, op: op.as_str(), chunk: index, source: e })
            }
        }
    };

    let mut failure = None;
    for (index, chunk) in updates.chunks(chunk_size).enumerate() {
        failure = attempt(WriteOp::Update, index, chunk.len(), service.update_rows(table_id, chunk));
        if failure.is_some() {
            break;
        }
    }
    if failure.is_none() {
        for (index, chunk) in creates.chunks(chunk_size).enumerate() {
            failure = attempt(WriteOp::Create, index, chunk.len(), service.add_rows(table_id, chunk));
            if failure.is_some() {
                break;
            }
        }
    }

    report.chunks_not_attempted = total_chunks - report.chunks.len();
    if let Some(ref e) = failure {
        log::error!("{e} ({} chunk(s) not attempted)", report.chunks_not_attempted);
    }
    (report, failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellWrite, Column, RowPosition, Table};
    use crate::service::MemoryService;

    fn service() -> MemoryService {
        let svc = MemoryService::new();
        svc.insert_table(Table {
            id: 1,
            name: "t".into(),
            columns: vec![Column { id: 10, title: "A".into() }],
            rows: vec![],
        });
        svc
    }

    fn creates(n: usize) -> Vec<NewRow> {
        (0..n)
            .map(|i| NewRow {
                position: RowPosition::Bottom,
                cells: vec![CellWrite { column_id: 10, value: (i as i64).into() }],
            })
            .collect()
    }

    #[test]
    fn partitions_into_bounded_chunks() {
        let svc = service();
        let (report, err) = write_plan(&svc, 1, &creates(1201), &[], 500);
        assert!(err.is_none());
        let sizes: Vec<_> = report.chunks.iter().map(|c| c.rows).collect();
        assert_eq!(sizes, vec![500, 500, 201]);
        assert_eq!(report.rows_written(WriteOp::Create), 1201);
        assert_eq!(svc.table(1).unwrap().rows.len(), 1201);
    }

    #[test]
    fn updates_go_before_creates() {
        let svc = service();
        svc.add_rows(1, &creates(1)).unwrap();
        let row_id = svc.table(1).unwrap().rows[0].id;
        let updates = vec![RowUpdate {
            row_id,
            cells: vec![CellWrite { column_id: 10, value: "patched".into() }],
        }];
        let (report, err) = write_plan(&svc, 1, &creates(2), &updates, 500);
        assert!(err.is_none());
        let ops: Vec<_> = report.chunks.iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![WriteOp::Update, WriteOp::Create]);
    }

    #[test]
    fn failed_chunk_stops_the_rest_without_rollback() {
        let svc = service();
        svc.fail_write_call(2);
        let (report, err) = write_plan(&svc, 1, &creates(5), &[], 2);

        let err = err.unwrap();
        assert!(matches!(err, SyncError::ChunkWrite { chunk: 1, op: "create", .. }));
        assert_eq!(report.chunks.len(), 2);
        assert!(report.chunks[0].is_ok());
        assert!(!report.chunks[1].is_ok());
        assert_eq!(report.chunks_not_attempted, 1);
        assert!(report.failed());
        // First chunk is committed.
        assert_eq!(svc.table(1).unwrap().rows.len(), 2);
    }

    #[test]
    fn empty_plan_makes_no_calls() {
        let svc = service();
        let (report, err) = write_plan(&svc, 1, &[], &[], 500);
        assert!(err.is_none());
        assert!(report.chunks.is_empty());
        assert_eq!(svc.write_calls(), 0);
    }
}
