//! Credential and endpoint resolution: explicit value > environment > default.

use crate::client::ClientError;

pub const ENV_TOKEN: &str = "SMARTSHEET_ACCESS_TOKEN";
pub const ENV_API_BASE: &str = "SMARTSHEET_API_BASE";
pub const DEFAULT_API_BASE: &str = "https://api.smartsheet.com/2.0";

/// Access token from the explicit value, else `SMARTSHEET_ACCESS_TOKEN`.
/// Blank values count as missing.
pub fn resolve_token(explicit: Option<String>) -> Result<String, ClientError> {
    explicit
        .or_else(|| std::env::var(ENV_TOKEN).ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ClientError::MissingToken)
}

/// API base URL without a trailing slash.
pub fn resolve_api_base(explicit: Option<String>) -> String {
    let base = explicit
        .or_else(|| std::env::var(ENV_API_BASE).ok())
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    base.trim().trim_end_matches('/').to_string()
}
