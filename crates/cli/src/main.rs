// sheetsync CLI - periodic source-to-target table reconciliation

mod exit_codes;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Reconcile source sheets into change-log and weekly snapshot sheets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass over every configured target
    #[command(after_help = "\
Examples:
  sheetsync run sync.toml
  sheetsync run sync.toml --dry-run --json
  sheetsync run sync.toml --today 2025-07-06 --output report.json
  SMARTSHEET_ACCESS_TOKEN=... sheetsync run")]
    Run {
        /// Path to the sync config (default: <config dir>/sheetsync/sync.toml)
        config: Option<PathBuf>,

        /// Smartsheet API access token
        #[arg(long, env = "SMARTSHEET_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API base URL
        #[arg(long, env = "SMARTSHEET_API_BASE")]
        api_base: Option<String>,

        /// Treat this date as today (YYYY-MM-DD); selects the current period
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Plan every target but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Output the run report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON run report to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a sync config without touching any sheet
    #[command(after_help = "\
Examples:
  sheetsync validate sync.toml")]
    Validate {
        /// Path to the sync config
        config: PathBuf,
    },

    /// List weekly period ends and their indices
    #[command(after_help = "\
Examples:
  sheetsync periods --epoch 2025-06-15
  sheetsync periods --epoch 2025-06-15 --from 2025-10-01 --to 2025-12-31 --json")]
    Periods {
        /// Week-0 anchor for period indices
        #[arg(long)]
        epoch: NaiveDate,

        /// First date to cover (default: the epoch)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to cover (default: end of the current week)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  sheetsync-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let result = match cli.command {
        Commands::Run { config, token, api_base, today, dry_run, json, output } => {
            sync::cmd_run(sync::RunArgs { config, token, api_base, today, dry_run, json, output })
        }
        Commands::Validate { config } => sync::cmd_validate(config),
        Commands::Periods { epoch, from, to, json } => sync::cmd_periods(epoch, from, to, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
