// stmtbook - monthly brokerage statement reconciliation and journal entries

mod books;
mod exit_codes;
mod layout;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use books::{ConfigCommands, PeriodArgs};
use exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stmtbook")]
#[command(about = "Reconcile a monthly brokerage statement into balanced journal entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Book one statement period: write entry CSVs and report reconciliation
    #[command(after_help = "\
Reads   <root>/scrapes/{holdings,income,activity,summary}/YYYY/MMW-YYYY-MM-*.csv
Writes  <root>/entries/{dividends,purchases,sales,unrealized}/YYYY/MMW-YYYY-MM-*.csv
        <root>/entries/MMW-YYYY-MM-ENT.csv (all blocks combined)

Examples:
  stmtbook run --root ~/books --year 2025 --month 5
  stmtbook run --root ~/books --year 2025 --month 5 --json > may.json
  stmtbook run --root ~/books --year 2025 --month 5 --no-block-files --strict")]
    Run {
        #[command(flatten)]
        period: PeriodArgs,

        /// Print the full run (entries, validation, report) as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Also write the JSON run to a file
        #[arg(long)]
        output: Option<std::path::PathBuf>,

        /// Only write the combined ENT file
        #[arg(long)]
        no_block_files: bool,

        /// Treat an impossible reconciliation (missing summary, income or
        /// holdings) as a mismatch
        #[arg(long)]
        strict: bool,
    },

    /// Reconcile one period without writing entry files
    #[command(after_help = "\
Examples:
  stmtbook validate --root ~/books --year 2025 --month 5
  stmtbook validate --root ~/books --year 2025 --month 5 --json")]
    Validate {
        #[command(flatten)]
        period: PeriodArgs,

        /// Print the validation result as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect books configs
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Log to stderr so `--json` stdout stays clean. `RUST_LOG` sets the filter
/// (default `info`); `STMTBOOK_LOG_FORMAT=json` switches to JSON lines.
/// `log` records from the engine are captured as well.
fn init_tracing() {
    let log_format = std::env::var("STMTBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run {
            period,
            json,
            output,
            no_block_files,
            strict,
        } => books::cmd_run(period, json, output, no_block_files, strict),
        Commands::Validate { period, json } => books::cmd_validate(period, json),
        Commands::Config(command) => books::cmd_config(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
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
        Self {
            code,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, msg)
    }

    /// Engine error with its registry exit code.
    pub fn recon(err: &stmtbook_recon::ReconError) -> Self {
        Self::new(exit_codes::recon_exit_code(err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
