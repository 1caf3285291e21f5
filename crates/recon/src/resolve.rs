//! Column references: stable id or human-readable title, resolved against
//! the live column list of one table read.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Column, ColumnId};

/// How a config file points at a column. Integers are ids, strings are titles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    ById(ColumnId),
    ByName(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "#{id}"),
            Self::ByName(name) => write!(f, "'{name}'"),
        }
    }
}

/// Title → id lookup over one table's columns.
///
/// Built per read and never cached across runs: titles can be renamed
/// between invocations.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    by_title: HashMap<String, ColumnId>,
}

impl ColumnIndex {
    pub fn new(columns: &[Column]) -> Self {
        let mut by_title = HashMap::with_capacity(columns.len());
        for col in columns {
            // First title wins if a sheet carries two columns with the same title.
            by_title.entry(col.title.clone()).or_insert(col.id);
        }
        Self { by_title }
    }

    /// Resolve a reference. Ids pass through unchecked; the service rejects
    /// unknown ids on write.
    pub fn resolve(&self, r: &ColumnRef) -> Option<ColumnId> {
        match r {
            ColumnRef::ById(id) => Some(*id),
            ColumnRef::ByName(name) => self.by_title.get(name).copied(),
        }
    }

    pub fn id_of(&self, title: &str) -> Option<ColumnId> {
        self.by_title.get(title).copied()
    }
}
