//! The remote table capability the engine runs against.
//!
//! Implemented over HTTP by `sheetsync-sheet-client` and in memory by
//! [`MemoryService`] for tests and dry runs.

use std::collections::HashMap;
use std::fmt;

use crate::model::{Cell, NewRow, Row, RowId, RowPosition, RowUpdate, Table, TableId, TableQuery};

/// Error surfaced by a [`TableService`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP-like status when the service reported one.
    pub status: Option<u16>,
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into() }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Get/add/update over tables, rows, columns and cells.
pub trait TableService {
    fn get_table(&self, id: TableId, query: &TableQuery) -> Result<Table, ServiceError>;

    fn add_rows(&self, table_id: TableId, rows: &[NewRow]) -> Result<(), ServiceError>;

    fn update_rows(&self, table_id: TableId, rows: &[RowUpdate]) -> Result<(), ServiceError>;
}

impl<T: TableService + ?Sized> TableService for &T {
    fn get_table(&self, id: TableId, query: &TableQuery) -> Result<Table, ServiceError> {
        (**self).get_table(id, query)
    }

    fn add_rows(&self, table_id: TableId, rows: &[NewRow]) -> Result<(), ServiceError> {
        (**self).add_rows(table_id, rows)
    }

    fn update_rows(&self, table_id: TableId, rows: &[RowUpdate]) -> Result<(), ServiceError> {
        (**self).update_rows(table_id, rows)
    }
}

// ---------------------------------------------------------------------------
// In-memory service
// ---------------------------------------------------------------------------

/// Single-process table store with the same add/update semantics as the
/// remote service: new rows get fresh ids, `Top` inserts at index 0, and
/// updates overwrite the named cells only.
#[derive(Debug, Default)]
pub struct MemoryService {
    tables: std::cell::RefCell<HashMap<TableId, Table>>,
    next_row_id: std::cell::Cell<RowId>,
    /// Fail every write call whose ordinal (1-based, across tables) is listed.
    fail_writes: std::cell::RefCell<Vec<usize>>,
    write_calls: std::cell::Cell<usize>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            next_row_id: std::cell::Cell::new(1_000_000),
            ..Self::default()
        }
    }

    pub fn insert_table(&self, table: Table) {
        self.tables.borrow_mut().insert(table.id, table);
    }

    pub fn table(&self, id: TableId) -> Option<Table> {
        self.tables.borrow().get(&id).cloned()
    }

    /// Make the n-th write call (1-based) fail.
    pub fn fail_write_call(&self, n: usize) {
        self.fail_writes.borrow_mut().push(n);
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.get()
    }

    fn begin_write(&self) -> Result<(), ServiceError> {
        let n = self.write_calls.get() + 1;
        self.write_calls.set(n);
        if self.fail_writes.borrow().contains(&n) {
            return Err(ServiceError::with_status(500, format!("injected failure on write {n}")));
        }
        Ok(())
    }
}

impl TableService for MemoryService {
    fn get_table(&self, id: TableId, query: &TableQuery) -> Result<Table, ServiceError> {
        let mut table = self
            .tables
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::with_status(404, format!("table {id} not found")))?;

        if let Some(ref ids) = query.column_ids {
            for row in &mut table.rows {
                row.cells.retain(|c| ids.contains(&c.column_id));
            }
        }
        Ok(table)
    }

    fn add_rows(&self, table_id: TableId, rows: &[NewRow]) -> Result<(), ServiceError> {
        self.begin_write()?;
        let mut tables = self.tables.borrow_mut();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| ServiceError::with_status(404, format!("table {table_id} not found")))?;

        for new_row in rows {
            let id = self.next_row_id.get();
            self.next_row_id.set(id + 1);
            let row = Row {
                id,
                cells: new_row
                    .cells
                    .iter()
                    .map(|c| Cell { column_id: c.column_id, value: c.value.clone() })
                    .collect(),
            };
            match new_row.position {
                RowPosition::Top => table.rows.insert(0, row),
                RowPosition::Bottom => table.rows.push(row),
            }
        }
        Ok(())
    }

    fn update_rows(&self, table_id: TableId, rows: &[RowUpdate]) -> Result<(), ServiceError> {
        self.begin_write()?;
        let mut tables = self.tables.borrow_mut();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| ServiceError::with_status(404, format!("table {table_id} not found")))?;

        for update in rows {
            let row = table
                .rows
                .iter_mut()
                .find(|r| r.id == update.row_id)
                .ok_or_else(|| ServiceError::with_status(404, format!("row {} not found", update.row_id)))?;
            for write in &update.cells {
                match row.cells.iter_mut().find(|c| c.column_id == write.column_id) {
                    Some(cell) => cell.value = write.value.clone(),
                    None => row.cells.push(Cell { column_id: write.column_id, value: write.value.clone() }),
                }
            }
        }
        Ok(())
    }
}
