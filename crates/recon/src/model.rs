use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::ReconError;

/// Amounts strictly below this (in absolute value) are immaterial.
pub const MATERIALITY: Decimal = dec!(0.01);

pub fn is_material(amount: Decimal) -> bool {
    amount.abs() >= MATERIALITY
}

/// Round to the cent. Banker's rounding, same as the statement exports.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Render with exactly `dp` decimals: `fixed(dec!(1000), 2)` → `"1000.00"`.
pub fn fixed(amount: Decimal, dp: u32) -> String {
    format!("{:.*}", dp as usize, amount.round_dp(dp))
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// One monthly statement period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatementPeriod {
    year: i32,
    month: u32,
    #[serde(skip)]
    last_day: NaiveDate,
}

impl StatementPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ReconError> {
        let invalid = || ReconError::InvalidPeriod { year, month };
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let last_day = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;
        Ok(Self { year, month, last_day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    /// The immediately preceding month (January wraps to December).
    pub fn prior(&self) -> Result<Self, ReconError> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

/// Beginning-of-period value as reported on the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum BeginningValue {
    Reported(Decimal),
    /// Empty cell or the literal `unavailable`.
    NotReported,
}

/// Which value the change-in-value computation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValueBasis {
    /// No cost basis: cash sweep / money-market fund. Never moves.
    MoneyMarket,
    /// Opened this period; the cost basis is the purchase consideration.
    NewPosition { cost_basis: Decimal },
    /// Held at the start of the period.
    Existing { beginning_value: Decimal },
    /// Beginning value reported but negative. Contributes nothing.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingPosition {
    pub symbol: String,
    pub description: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub beginning_value: BeginningValue,
    pub ending_value: Decimal,
    pub cost_basis: Option<Decimal>,
    pub unrealized_gain: Option<Decimal>,
}

impl HoldingPosition {
    pub fn is_money_market(&self) -> bool {
        self.cost_basis.map_or(true, |c| c.is_zero())
    }

    pub fn basis(&self) -> ValueBasis {
        let cost_basis = match self.cost_basis {
            Some(c) if !c.is_zero() => c,
            _ => return ValueBasis::MoneyMarket,
        };
        match self.beginning_value {
            BeginningValue::NotReported => ValueBasis::NewPosition { cost_basis },
            BeginningValue::Reported(b) if b.is_zero() => ValueBasis::NewPosition { cost_basis },
            BeginningValue::Reported(b) if b > Decimal::ZERO => {
                ValueBasis::Existing { beginning_value: b }
            }
            BeginningValue::Reported(_) => ValueBasis::Unavailable,
        }
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Bought,
    Sold,
    /// Anything else the brokerage reports in the activity feed. Ignored.
    Other(String),
}

impl TradeAction {
    /// Brokerage exports use free text such as "You Bought" / "You Sold".
    pub fn parse(text: &str) -> Self {
        if text.contains("Bought") {
            Self::Bought
        } else if text.contains("Sold") {
            Self::Sold
        } else {
            Self::Other(text.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTransaction {
    pub settlement_date: NaiveDate,
    pub action: TradeAction,
    pub symbol: String,
    pub security_name: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    /// Always positive; direction comes from `action`.
    pub amount: Decimal,
    pub transaction_cost: Option<Decimal>,
    /// Free-text sub-grouping tag. Empty when the export leaves it blank.
    pub basket: String,
    /// Carrying value removed from the books. Sales only.
    pub cost_basis: Option<Decimal>,
}

impl ActivityTransaction {
    pub fn is_purchase(&self) -> bool {
        self.action == TradeAction::Bought
    }

    pub fn is_sale(&self) -> bool {
        self.action == TradeAction::Sold
    }
}

// ---------------------------------------------------------------------------
// Income
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeTransaction {
    pub settlement_date: NaiveDate,
    pub security_name: String,
    pub symbol: String,
    pub cusip: String,
    pub description: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub amount: Decimal,
}

impl IncomeTransaction {
    /// Reinvested distributions never leave the account as cash.
    pub fn is_reinvestment(&self) -> bool {
        self.description.contains("Reinvestment")
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub beginning_value_period: Decimal,
    pub additions_period: Decimal,
    pub subtractions_period: Decimal,
    pub change_investment_value_period: Decimal,
    pub ending_value_period: Decimal,
    pub beginning_value_ytd: Decimal,
    pub additions_ytd: Decimal,
    pub subtractions_ytd: Decimal,
    pub change_investment_value_ytd: Decimal,
    pub ending_value_ytd: Decimal,
    pub income_period: Decimal,
    pub income_ytd: Decimal,
}

impl Summary {
    /// Change in investment value that is not income.
    pub fn unrealized_gains(&self) -> Decimal {
        self.change_investment_value_period - self.income_period
    }

    /// beginning + additions + subtractions + income + unrealized == ending.
    /// Subtractions are reported as negative numbers.
    pub fn is_internally_consistent(&self) -> bool {
        let rolled = self.beginning_value_period
            + self.additions_period
            + self.subtractions_period
            + self.income_period
            + self.unrealized_gains();
        !is_material(rolled - self.ending_value_period)
    }
}

// ---------------------------------------------------------------------------
// Record sets
// ---------------------------------------------------------------------------

/// One loaded input, or the reason it isn't available.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSet<T> {
    Loaded(T),
    /// Not provided for this period. Treated as "no records of this kind".
    Missing,
    /// Provided but failed to parse. Dependent computations are aborted.
    Malformed(ReconError),
}

impl<T> RecordSet<T> {
    /// `MissingInput` errors become `Missing`; everything else is `Malformed`.
    pub fn from_result(result: Result<T, ReconError>) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(err) if err.is_missing() => Self::Missing,
            Err(err) => Self::Malformed(err),
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn malformed(&self) -> Option<&ReconError> {
        match self {
            Self::Malformed(err) => Some(err),
            _ => None,
        }
    }

    pub fn status(&self) -> RecordSetStatus {
        match self {
            Self::Loaded(_) => RecordSetStatus::Loaded,
            Self::Missing => RecordSetStatus::Missing,
            Self::Malformed(_) => RecordSetStatus::Malformed,
        }
    }
}

impl<T> Default for RecordSet<T> {
    fn default() -> Self {
        Self::Missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSetStatus {
    Loaded,
    Missing,
    Malformed,
}

/// Everything the engine needs for one period, loaded up front.
#[derive(Debug, Clone)]
pub struct StatementInput {
    pub period: StatementPeriod,
    pub holdings: RecordSet<Vec<HoldingPosition>>,
    /// Previous month's holdings snapshot, read only for liquidation values.
    pub prior_holdings: RecordSet<Vec<HoldingPosition>>,
    pub income: RecordSet<Vec<IncomeTransaction>>,
    pub activity: RecordSet<Vec<ActivityTransaction>>,
    pub summary: RecordSet<Summary>,
}

impl StatementInput {
    pub fn new(period: StatementPeriod) -> Self {
        Self {
            period,
            holdings: RecordSet::Missing,
            prior_holdings: RecordSet::Missing,
            income: RecordSet::Missing,
            activity: RecordSet::Missing,
            summary: RecordSet::Missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Journal entries
// ---------------------------------------------------------------------------

/// Entry-type block. Each block numbers its journals independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryBlock {
    Dividends,
    Purchases,
    Sales,
    Unrealized,
}

impl EntryBlock {
    /// Export order of the combined stream.
    pub const ALL: [EntryBlock; 4] = [
        EntryBlock::Dividends,
        EntryBlock::Purchases,
        EntryBlock::Sales,
        EntryBlock::Unrealized,
    ];

    pub fn base_suffix(&self) -> u32 {
        match self {
            Self::Dividends => 10001,
            Self::Purchases => 20001,
            Self::Sales => 30001,
            Self::Unrealized => 40001,
        }
    }

    /// Short code used in reference numbers and file names.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Dividends => "DIV",
            Self::Purchases => "PUR",
            Self::Sales => "SAL",
            Self::Unrealized => "UNR",
        }
    }
}

impl std::fmt::Display for EntryBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dividends => write!(f, "dividends"),
            Self::Purchases => write!(f, "purchases"),
            Self::Sales => write!(f, "sales"),
            Self::Unrealized => write!(f, "unrealized"),
        }
    }
}

/// Exactly one side of a ledger line is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    Debit(Decimal),
    Credit(Decimal),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub journal_date: NaiveDate,
    pub reference_number: String,
    pub journal_prefix: String,
    pub journal_suffix: u32,
    pub notes: String,
    pub account: String,
    pub description: String,
    pub side: EntrySide,
    pub currency: String,
}

impl JournalEntry {
    pub fn journal_number(&self) -> String {
        format!("{}{}", self.journal_prefix, self.journal_suffix)
    }

    pub fn debit(&self) -> Option<Decimal> {
        match self.side {
            EntrySide::Debit(amount) => Some(amount),
            EntrySide::Credit(_) => None,
        }
    }

    pub fn credit(&self) -> Option<Decimal> {
        match self.side {
            EntrySide::Credit(amount) => Some(amount),
            EntrySide::Debit(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Entries produced by one block. Only blocks with at least one entry appear.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntries {
    pub block: EntryBlock,
    pub entries: Vec<JournalEntry>,
}

/// A block that was skipped because an input it depends on is malformed.
#[derive(Debug, Clone, Serialize)]
pub struct BlockFailure {
    pub block: EntryBlock,
    pub input: crate::error::InputKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub period: String,
    pub engine_version: String,
    pub config_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalRun {
    pub meta: RunMeta,
    pub blocks: Vec<BlockEntries>,
    pub failures: Vec<BlockFailure>,
    pub validation: crate::validate::Validation,
    pub report: crate::report::PeriodReport,
}

impl JournalRun {
    pub fn entries_for(&self, block: EntryBlock) -> Option<&[JournalEntry]> {
        self.blocks
            .iter()
            .find(|b| b.block == block)
            .map(|b| b.entries.as_slice())
    }

    /// All entries in export order.
    pub fn combined(&self) -> Vec<JournalEntry> {
        crate::export::combine(&self.blocks)
    }

    pub fn is_validated(&self) -> bool {
        self.validation.validated
    }

    pub fn to_json_pretty(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Io(e.to_string()))
    }
}
