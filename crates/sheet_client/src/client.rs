//! Smartsheet HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).

use std::time::Duration;

use sheetsync_recon::model::{NewRow, RowUpdate, Table, TableId, TableQuery};
use sheetsync_recon::service::{ServiceError, TableService};

use crate::wire::{error_message, NewRowOut, RowUpdateOut, SheetBody};

/// Smartsheet API client (blocking).
#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

/// Error type for sheet operations.
#[derive(Debug)]
pub enum ClientError {
    /// No access token configured
    MissingToken,
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::MissingToken => write!(f, "missing Smartsheet access token"),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ClientError> for ServiceError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(code, msg) => ServiceError::with_status(code, msg),
            other => ServiceError::new(other.to_string()),
        }
    }
}

impl SheetClient {
    /// Create a client for `api_base` (e.g. `https://api.smartsheet.com/2.0`).
    pub fn new(token: String, api_base: String) -> Result<Self, ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::MissingToken);
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("sheetsync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ClientError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Read a sheet with its columns and rows.
    pub fn get_sheet(&self, sheet_id: TableId, query: &TableQuery) -> Result<Table, ClientError> {
        let url = format!("{}/sheets/{}", self.api_base, sheet_id);
        let mut req = self.http.get(&url).bearer_auth(&self.token);
        if let Some(ref ids) = query.column_ids {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            req = req.query(&[("columnIds", ids.join(","))]);
        }
        log::debug!("GET {url}");

        let response = Self::check(req.send())?;
        let body: SheetBody = response.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(Table::from(body))
    }

    /// Insert rows in one call.
    pub fn add_rows(&self, sheet_id: TableId, rows: &[NewRow]) -> Result<(), ClientError> {
        let url = format!("{}/sheets/{}/rows", self.api_base, sheet_id);
        let body: Vec<NewRowOut> = rows.iter().map(NewRowOut::from).collect();
        log::debug!("POST {url} ({} rows)", body.len());
        let req = self.http.post(&url).bearer_auth(&self.token).json(&body);
        Self::check(req.send())?;
        Ok(())
    }

    /// Patch rows in one call.
    pub fn update_rows(&self, sheet_id: TableId, rows: &[RowUpdate]) -> Result<(), ClientError> {
        let url = format!("{}/sheets/{}/rows", self.api_base, sheet_id);
        let body: Vec<RowUpdateOut> = rows.iter().map(RowUpdateOut::from).collect();
        log::debug!("PUT {url} ({} rows)", body.len());
        let req = self.http.put(&url).bearer_auth(&self.token).json(&body);
        Self::check(req.send())?;
        Ok(())
    }

    /// Map transport failures and non-2xx statuses to [`ClientError`].
    fn check(
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<reqwest::blocking::Response, ClientError> {
        let response = result.map_err(|e| ClientError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Http(status, error_message(&body)));
        }
        Ok(response)
    }
}

impl TableService for SheetClient {
    fn get_table(&self, id: TableId, query: &TableQuery) -> Result<Table, ServiceError> {
        Ok(self.get_sheet(id, query)?)
    }

    fn add_rows(&self, table_id: TableId, rows: &[NewRow]) -> Result<(), ServiceError> {
        Ok(SheetClient::add_rows(self, table_id, rows)?)
    }

    fn update_rows(&self, table_id: TableId, rows: &[RowUpdate]) -> Result<(), ServiceError> {
        Ok(SheetClient::update_rows(self, table_id, rows)?)
    }
}
