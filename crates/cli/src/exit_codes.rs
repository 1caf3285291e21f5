//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `sheetsync` exit codes.
//! Exit codes are part of the shell contract: schedulers and wrapper
//! scripts branch on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | CLI usage error (bad args, missing file)            |
//! | 3    | Config file failed to parse or validate             |
//! | 4    | No access token                                     |
//! | 5    | A source table could not be loaded; run aborted     |
//! | 6    | Run finished but one or more targets failed         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - every target synced, planned, skipped or already up to date.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable config path.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed, or parsed but failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// No access token from `--token` or `SMARTSHEET_ACCESS_TOKEN`.
/// Raised before any network call.
pub const EXIT_MISSING_TOKEN: u8 = 4;

/// A source table could not be read (network, auth, missing key column).
/// No target is written after this.
pub const EXIT_SOURCE_LOAD: u8 = 5;

/// The run completed but at least one target failed to load or write.
/// Other targets were still processed; see the run report.
pub const EXIT_TARGET_FAILED: u8 = 6;
