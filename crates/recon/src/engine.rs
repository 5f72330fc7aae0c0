use crate::accounts::{AccountLookup, ChartOfAccounts};
use crate::config::BooksConfig;
use crate::error::{InputKind, ReconError};
use crate::journal::JournalBuilder;
use crate::model::{
    BlockEntries, BlockFailure, EntryBlock, JournalEntry, JournalRun, RecordSet, RunMeta,
    StatementInput,
};
use crate::report::PeriodReport;
use crate::validate::Validation;
use crate::valuation::{Valuation, ValuationGap};

/// Build every entry block for one period, then validate and report.
///
/// Each block is all-or-nothing. A malformed input skips only the blocks
/// that depend on it; the rest still run. A missing input means "no
/// records of that kind". A missing chart of accounts books securities to
/// their ticker; a malformed one skips purchases and sales.
pub fn run<A: AccountLookup>(
    config: &BooksConfig,
    input: &StatementInput,
    accounts: &RecordSet<A>,
) -> Result<JournalRun, ReconError> {
    config.validate()?;

    let period = input.period;
    let no_chart = ChartOfAccounts::empty();
    let lookup: &dyn AccountLookup = match accounts {
        RecordSet::Loaded(chart) => chart,
        RecordSet::Missing | RecordSet::Malformed(_) => &no_chart,
    };
    let builder = JournalBuilder::new(config, lookup);
    let mut blocks = Vec::new();
    let mut failures = Vec::new();

    // Dividends ← income
    match &input.income {
        RecordSet::Loaded(rows) => push_block(&mut blocks, EntryBlock::Dividends, builder.dividends(rows)),
        RecordSet::Missing => log::info!("{period}: no income records, dividends skipped"),
        RecordSet::Malformed(err) => fail(&mut failures, EntryBlock::Dividends, InputKind::Income, err),
    }

    // Purchases, sales ← activity, chart of accounts
    match (&input.activity, accounts.malformed()) {
        (RecordSet::Loaded(rows), None) => {
            push_block(&mut blocks, EntryBlock::Purchases, builder.purchases(rows));
            push_block(&mut blocks, EntryBlock::Sales, builder.sales(rows));
        }
        (RecordSet::Loaded(_), Some(err)) => {
            fail(&mut failures, EntryBlock::Purchases, InputKind::ChartOfAccounts, err);
            fail(&mut failures, EntryBlock::Sales, InputKind::ChartOfAccounts, err);
        }
        (RecordSet::Missing, _) => log::info!("{period}: no activity records, purchases and sales skipped"),
        (RecordSet::Malformed(err), _) => {
            fail(&mut failures, EntryBlock::Purchases, InputKind::Activity, err);
            fail(&mut failures, EntryBlock::Sales, InputKind::Activity, err);
        }
    }

    // Unrealized ← holdings, activity, prior holdings
    let valuation = Valuation::for_period(input, builder.classifier());
    match &valuation {
        Ok(valuation) => {
            let period_end = input
                .summary
                .loaded()
                .map(|s| s.period_end)
                .unwrap_or_else(|| period.last_day());
            push_block(
                &mut blocks,
                EntryBlock::Unrealized,
                builder.unrealized(valuation, period_end),
            );
        }
        Err(ValuationGap::NoHoldings) => {
            log::info!("{period}: no holdings snapshot, mark-to-market skipped");
        }
        Err(ValuationGap::Malformed(kind, err)) => {
            fail(&mut failures, EntryBlock::Unrealized, *kind, err);
        }
    }

    let validation = Validation::check(input, valuation.as_ref().map_err(ValuationGap::input));
    match (validation.validated, validation.difference) {
        (true, _) => log::info!("{period}: reconciled"),
        (false, Some(diff)) => log::warn!("{period}: reconciliation mismatch of {diff}"),
        (false, None) => log::warn!(
            "{period}: reconciliation not possible, unavailable: {}",
            validation
                .unavailable
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }

    let report = PeriodReport::build(input, valuation.as_ref().ok(), builder.classifier());

    Ok(JournalRun {
        meta: RunMeta {
            period: period.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            config_name: config.name.clone(),
        },
        blocks,
        failures,
        validation,
        report,
    })
}

fn push_block(blocks: &mut Vec<BlockEntries>, block: EntryBlock, entries: Vec<JournalEntry>) {
    if entries.is_empty() {
        log::debug!("{block}: nothing to book");
        return;
    }
    let journals = entries
        .iter()
        .map(|e| e.journal_suffix)
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    log::info!("{block}: {} entries in {journals} journals", entries.len());
    blocks.push(BlockEntries { block, entries });
}

fn fail(failures: &mut Vec<BlockFailure>, block: EntryBlock, input: InputKind, err: &ReconError) {
    log::warn!("{block}: skipped, {err}");
    failures.push(BlockFailure {
        block,
        input,
        message: err.to_string(),
    });
}
