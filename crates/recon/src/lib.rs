//! `sheetsync-recon` — source-to-target table reconciliation engine.
//!
//! Pure engine crate: reads tables through the [`TableService`] seam,
//! plans create/update operations per target, and writes them in chunks.
//! No HTTP, CLI or logger setup lives here.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolve;
pub mod runner;
pub mod scan;
pub mod service;
pub mod tracking;
pub mod writer;

pub use config::SyncConfig;
pub use engine::{plan_target, TargetPlan};
pub use error::SyncError;
pub use model::{CellValue, Column, Row, Table};
pub use runner::{run, RunOptions, RunReport};
pub use service::{ServiceError, TableService};
