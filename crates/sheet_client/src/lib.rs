//! Smartsheet API client for sheetsync.
//!
//! Implements `sheetsync_recon::TableService` over the REST API: read a
//! sheet, add rows, update rows. Bearer-token auth, blocking HTTP.
//!
//! No retries. A failed call surfaces to the engine, which decides what the
//! failure means for the run.

mod auth;
mod client;
mod wire;

pub use auth::{resolve_api_base, resolve_token, DEFAULT_API_BASE, ENV_API_BASE, ENV_TOKEN};
pub use client::{ClientError, SheetClient};
