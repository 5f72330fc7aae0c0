//! `stmtbook run`, `stmtbook validate`, `stmtbook config`.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde::Serialize;

use stmtbook_recon::export::write_entries_csv;
use stmtbook_recon::load::{
    load_activity, load_holdings, load_income, load_prior_holdings, load_summary, read_input,
};
use stmtbook_recon::model::fixed;
use stmtbook_recon::report::SummaryCheck;
use stmtbook_recon::validate::Validation;
use stmtbook_recon::{
    BooksConfig, ChartOfAccounts, EntryBlock, InputKind, JournalEntry, JournalRun, RecordSet,
    ReconError, StatementInput, StatementPeriod,
};

use crate::exit_codes::{EXIT_MALFORMED_INPUT, EXIT_MISMATCH};
use crate::layout::StatementLayout;
use crate::CliError;

#[derive(Args)]
pub struct PeriodArgs {
    /// Statement root directory (holds scrapes/, books/, entries/)
    #[arg(long, env = "STMTBOOK_ROOT")]
    pub root: PathBuf,

    /// Statement year
    #[arg(long)]
    pub year: i32,

    /// Statement month (1-12)
    #[arg(long)]
    pub month: u32,

    /// Books config (default: <root>/books.toml if present, else builtin)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Parse and validate a books config file
    #[command(after_help = "\
Examples:
  stmtbook config check ~/books/books.toml")]
    Check {
        /// Path to the books TOML file
        file: PathBuf,
    },

    /// Print the builtin books config as TOML
    #[command(after_help = "\
Examples:
  stmtbook config show > ~/books/books.toml")]
    Show,
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Everything loaded for one period before the engine runs.
struct Prepared {
    period: StatementPeriod,
    config: BooksConfig,
    layout: StatementLayout,
    input: StatementInput,
    chart: RecordSet<ChartOfAccounts>,
}

fn prepare(args: &PeriodArgs) -> Result<Prepared, CliError> {
    let period = StatementPeriod::new(args.year, args.month)
        .map_err(|e| CliError::usage(e.to_string()))?;
    let config = resolve_config(&args.root, args.config.as_deref())?;
    let layout = StatementLayout::new(&args.root, config.journal.file_prefix.clone());

    let mut input = StatementInput::new(period);
    input.holdings = load_set(&layout, period, InputKind::Holdings, load_holdings);
    input.prior_holdings = load_set(&layout, period, InputKind::PriorHoldings, load_prior_holdings);
    input.income = load_set(&layout, period, InputKind::Income, load_income);
    input.activity = load_set(&layout, period, InputKind::Activity, load_activity);
    input.summary = load_set(&layout, period, InputKind::Summary, load_summary);

    let chart = load_chart(&layout);

    Ok(Prepared {
        period,
        config,
        layout,
        input,
        chart,
    })
}

/// `--config`, else `<root>/books.toml`, else the builtin table.
fn resolve_config(root: &Path, explicit: Option<&Path>) -> Result<BooksConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = StatementLayout::config_path(root);
            if !default.exists() {
                log::debug!("using builtin books config");
                return BooksConfig::builtin().map_err(|e| CliError::recon(&e));
            }
            default
        }
    };
    log::debug!("books config: {}", path.display());
    load_config_file(&path)
}

fn load_config_file(path: &Path) -> Result<BooksConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read config {}: {e}", path.display())))?;
    BooksConfig::from_toml(&text).map_err(|e| CliError::recon(&e))
}

fn load_set<T>(
    layout: &StatementLayout,
    period: StatementPeriod,
    kind: InputKind,
    parse: fn(&str) -> Result<T, ReconError>,
) -> RecordSet<T> {
    let Some(path) = layout.input(kind, period) else {
        return RecordSet::Missing;
    };
    let set = RecordSet::from_result(read_input(kind, &path).and_then(|data| parse(&data)));
    match &set {
        RecordSet::Loaded(_) => log::debug!("{kind}: loaded {}", path.display()),
        RecordSet::Missing => log::info!("{kind}: {} not found", path.display()),
        RecordSet::Malformed(err) => log::warn!("{kind}: {err}"),
    }
    set
}

/// A missing chart books every security to its bare ticker. A malformed one
/// only skips purchases and sales.
fn load_chart(layout: &StatementLayout) -> RecordSet<ChartOfAccounts> {
    let path = layout.chart_of_accounts();
    let chart = RecordSet::from_result(
        read_input(InputKind::ChartOfAccounts, &path)
            .and_then(|data| ChartOfAccounts::from_csv(&data)),
    );
    match &chart {
        RecordSet::Loaded(chart) => {
            log::debug!("chart of accounts: {} security accounts", chart.len())
        }
        RecordSet::Missing => {
            log::warn!("{} not found; securities booked to ticker names", path.display())
        }
        RecordSet::Malformed(err) => log::warn!("{}: {err}", path.display()),
    }
    chart
}

fn run_engine(prepared: &Prepared) -> Result<JournalRun, CliError> {
    stmtbook_recon::run(&prepared.config, &prepared.input, &prepared.chart)
        .map_err(|e| CliError::recon(&e))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    args: PeriodArgs,
    json_output: bool,
    output_file: Option<PathBuf>,
    no_block_files: bool,
    strict: bool,
) -> Result<(), CliError> {
    let prepared = prepare(&args)?;
    let run = run_engine(&prepared)?;
    let period = prepared.period;

    clear_outputs(&prepared.layout, period)?;
    if !no_block_files {
        for block in &run.blocks {
            let path = prepared.layout.block_output(block.block, period);
            write_entries_file(&path, &block.entries)?;
        }
    }
    let combined = run.combined();
    if combined.is_empty() {
        log::info!("{period}: no entries, nothing written");
    } else {
        write_entries_file(&prepared.layout.combined_output(period), &combined)?;
    }

    if json_output || output_file.is_some() {
        let json_str = run
            .to_json_pretty()
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = output_file {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }

    print_run_summary(&run);

    if !run.failures.is_empty() {
        return Err(CliError::new(
            EXIT_MALFORMED_INPUT,
            format!("{} entry block(s) skipped on malformed input", run.failures.len()),
        )
        .with_hint("fix the reported rows and re-run; the other blocks were written"));
    }
    check_validation(&run.validation, strict)
}

/// Remove the period's entry files from an earlier run so `entries/` only
/// ever holds what this run produced.
fn clear_outputs(layout: &StatementLayout, period: StatementPeriod) -> Result<(), CliError> {
    let stale = EntryBlock::ALL
        .iter()
        .map(|block| layout.block_output(*block, period))
        .chain(std::iter::once(layout.combined_output(period)));
    for path in stale {
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CliError::runtime(format!(
                    "cannot remove {}: {e}",
                    path.display()
                )))
            }
        }
    }
    Ok(())
}

fn write_entries_file(path: &Path, entries: &[JournalEntry]) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
    write_entries_csv(entries, BufWriter::new(file)).map_err(|e| CliError::recon(&e))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn check_validation(validation: &Validation, strict: bool) -> Result<(), CliError> {
    if validation.validated {
        return Ok(());
    }
    match validation.difference {
        Some(diff) => Err(CliError::new(
            EXIT_MISMATCH,
            format!("reconciliation mismatch: difference {}", fixed(diff, 2)),
        )),
        None if strict => Err(CliError::new(
            EXIT_MISMATCH,
            format!("cannot reconcile: {} unavailable", kinds(&validation.unavailable)),
        )),
        None => Ok(()),
    }
}

fn kinds(unavailable: &[InputKind]) -> String {
    unavailable
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Human summary to stderr
fn print_run_summary(run: &JournalRun) {
    let combined = run.combined();
    let journals: BTreeSet<String> = combined.iter().map(|e| e.journal_number()).collect();
    eprintln!(
        "{}: {} entries in {} journals",
        run.meta.period,
        combined.len(),
        journals.len()
    );

    for block in &run.blocks {
        let numbers: BTreeSet<u32> = block.entries.iter().map(|e| e.journal_suffix).collect();
        eprintln!(
            "  {:<11} {:>4} entries {:>4} journals",
            block.block.to_string(),
            block.entries.len(),
            numbers.len()
        );
    }
    for failure in &run.failures {
        eprintln!("  {:<11} skipped: {}", failure.block.to_string(), failure.message);
    }

    if let Some(valuation) = &run.report.valuation {
        for basket in &valuation.baskets {
            eprintln!(
                "  basket {} {:<20} {:>12}  {}",
                basket.id,
                basket.name,
                fixed(basket.change, 2),
                if basket.material { "booked" } else { "immaterial" }
            );
        }
        for liq in &valuation.liquidations {
            match liq.period_change {
                Some(change) => eprintln!("  sold out {:<6} {:>12}", liq.symbol, fixed(change, 2)),
                None => eprintln!("  sold out {:<6} {:>12}  (no prior value)", liq.symbol, "-"),
            }
        }
    }

    print_validation(&run.validation, run.report.summary.as_ref());
}

fn print_validation(validation: &Validation, summary: Option<&SummaryCheck>) {
    match (validation.expected, validation.actual, validation.difference) {
        (Some(expected), Some(actual), Some(diff)) => eprintln!(
            "reconciliation: expected {}, actual {}, difference {}: {}",
            fixed(expected, 2),
            fixed(actual, 2),
            fixed(diff, 2),
            if validation.validated { "ok" } else { "MISMATCH" }
        ),
        _ => eprintln!(
            "reconciliation: not possible, unavailable: {}",
            kinds(&validation.unavailable)
        ),
    }
    if let Some(summary) = summary {
        if !summary.internally_consistent {
            eprintln!("summary: beginning + flows + change does not equal ending value");
        }
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ValidateOutput<'a> {
    period: &'a str,
    validation: &'a Validation,
    summary: Option<&'a SummaryCheck>,
}

pub fn cmd_validate(args: PeriodArgs, json_output: bool) -> Result<(), CliError> {
    let prepared = prepare(&args)?;
    let run = run_engine(&prepared)?;

    if json_output {
        let out = ValidateOutput {
            period: &run.meta.period,
            validation: &run.validation,
            summary: run.report.summary.as_ref(),
        };
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }
    print_validation(&run.validation, run.report.summary.as_ref());

    check_validation(&run.validation, true)
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Check { file } => {
            let config = load_config_file(&file)?;
            eprintln!(
                "ok: {} ({} baskets, {} symbols, journal prefix {})",
                config.name,
                config.baskets.len(),
                config.symbol_count(),
                config.journal.prefix
            );
            Ok(())
        }
        ConfigCommands::Show => {
            let text = BooksConfig::builtin()
                .and_then(|c| c.to_toml())
                .map_err(|e| CliError::config(e.to_string()))?;
            print!("{text}");
            Ok(())
        }
    }
}
