//! Statement CSV exports → typed records.
//!
//! Every loader checks its required columns against the header first, then
//! parses row by row. The first unparseable field fails the whole record set
//! with its 1-based data row number. Rows whose cells are all blank are skipped.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{InputKind, ReconError};
use crate::model::{
    ActivityTransaction, BeginningValue, HoldingPosition, IncomeTransaction, Summary, TradeAction,
};

const HOLDINGS_COLUMNS: &[&str] = &[
    "symbol",
    "description",
    "quantity",
    "price",
    "beginning_value",
    "ending_value",
    "cost_basis",
    "unrealized_gain",
];

const INCOME_COLUMNS: &[&str] = &[
    "settlement_date",
    "security_name",
    "symbol",
    "cusip",
    "description",
    "quantity",
    "price",
    "amount",
];

/// `transaction_cost`, `basket` and `cost_basis` may be absent from the header.
const ACTIVITY_COLUMNS: &[&str] = &[
    "settlement_date",
    "action",
    "symbol",
    "security_name",
    "quantity",
    "price",
    "amount",
];

const SUMMARY_COLUMNS: &[&str] = &[
    "period_start",
    "period_end",
    "beginning_value_period",
    "additions_period",
    "subtractions_period",
    "change_investment_value_period",
    "ending_value_period",
    "beginning_value_ytd",
    "additions_ytd",
    "subtractions_ytd",
    "change_investment_value_ytd",
    "ending_value_ytd",
    "income_period",
    "income_ytd",
];

const NOT_REPORTED: &str = "unavailable";

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

struct Columns {
    kind: InputKind,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(kind: InputKind, headers: &csv::StringRecord, required: &[&str]) -> Result<Self, ReconError> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        if let Some(missing) = required.iter().find(|c| !index.contains_key(**c)) {
            return Err(ReconError::MissingColumn {
                kind,
                column: (*missing).to_string(),
            });
        }
        Ok(Self { kind, index })
    }

    fn row<'r>(&'r self, number: usize, record: &'r csv::StringRecord) -> Row<'r> {
        Row {
            columns: self,
            number,
            record,
        }
    }
}

struct Row<'r> {
    columns: &'r Columns,
    number: usize,
    record: &'r csv::StringRecord,
}

impl Row<'_> {
    /// Trimmed cell, empty when the column or cell is absent.
    fn text(&self, field: &str) -> &str {
        self.columns
            .index
            .get(field)
            .and_then(|i| self.record.get(*i))
            .map(str::trim)
            .unwrap_or("")
    }

    fn error(&self, field: &str) -> ReconError {
        ReconError::malformed(self.columns.kind, self.number, field, self.text(field))
    }

    fn decimal(&self, field: &str) -> Result<Decimal, ReconError> {
        parse_decimal(self.text(field)).ok_or_else(|| self.error(field))
    }

    fn opt_decimal(&self, field: &str) -> Result<Option<Decimal>, ReconError> {
        if self.text(field).is_empty() {
            return Ok(None);
        }
        self.decimal(field).map(Some)
    }

    fn date(&self, field: &str) -> Result<NaiveDate, ReconError> {
        NaiveDate::parse_from_str(self.text(field), "%Y-%m-%d").map_err(|_| self.error(field))
    }

    fn required_text(&self, field: &str) -> Result<String, ReconError> {
        match self.text(field) {
            "" => Err(self.error(field)),
            value => Ok(value.to_string()),
        }
    }
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// Parse every non-blank data row with `parse`.
fn load_rows<T>(
    kind: InputKind,
    csv_data: &str,
    required: &[&str],
    mut parse: impl FnMut(&Row<'_>) -> Result<T, ReconError>,
) -> Result<Vec<T>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = Columns::new(kind, &headers, required)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(parse(&columns.row(i + 1, &record))?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Record sets
// ---------------------------------------------------------------------------

pub fn load_holdings(csv_data: &str) -> Result<Vec<HoldingPosition>, ReconError> {
    parse_holdings(InputKind::Holdings, csv_data)
}

/// Same schema as [`load_holdings`]; errors are attributed to the prior snapshot.
pub fn load_prior_holdings(csv_data: &str) -> Result<Vec<HoldingPosition>, ReconError> {
    parse_holdings(InputKind::PriorHoldings, csv_data)
}

fn parse_holdings(kind: InputKind, csv_data: &str) -> Result<Vec<HoldingPosition>, ReconError> {
    load_rows(kind, csv_data, HOLDINGS_COLUMNS, |row| {
        let beginning_value = match row.text("beginning_value") {
            "" => BeginningValue::NotReported,
            v if v.eq_ignore_ascii_case(NOT_REPORTED) => BeginningValue::NotReported,
            _ => BeginningValue::Reported(row.decimal("beginning_value")?),
        };
        Ok(HoldingPosition {
            symbol: row.required_text("symbol")?,
            description: row.text("description").to_string(),
            quantity: row.decimal("quantity")?,
            price: row.decimal("price")?,
            beginning_value,
            ending_value: row.decimal("ending_value")?,
            cost_basis: row.opt_decimal("cost_basis")?,
            unrealized_gain: row.opt_decimal("unrealized_gain")?,
        })
    })
}

pub fn load_income(csv_data: &str) -> Result<Vec<IncomeTransaction>, ReconError> {
    load_rows(InputKind::Income, csv_data, INCOME_COLUMNS, |row| {
        Ok(IncomeTransaction {
            settlement_date: row.date("settlement_date")?,
            security_name: row.text("security_name").to_string(),
            symbol: row.required_text("symbol")?,
            cusip: row.text("cusip").to_string(),
            description: row.text("description").to_string(),
            quantity: row.opt_decimal("quantity")?,
            price: row.opt_decimal("price")?,
            amount: row.decimal("amount")?,
        })
    })
}

pub fn load_activity(csv_data: &str) -> Result<Vec<ActivityTransaction>, ReconError> {
    load_rows(InputKind::Activity, csv_data, ACTIVITY_COLUMNS, |row| {
        Ok(ActivityTransaction {
            settlement_date: row.date("settlement_date")?,
            action: TradeAction::parse(row.text("action")),
            symbol: row.required_text("symbol")?,
            security_name: row.text("security_name").to_string(),
            quantity: row.opt_decimal("quantity")?,
            price: row.opt_decimal("price")?,
            amount: row.decimal("amount")?,
            transaction_cost: row.opt_decimal("transaction_cost")?,
            basket: row.text("basket").to_string(),
            cost_basis: row.opt_decimal("cost_basis")?,
        })
    })
}

pub fn load_summary(csv_data: &str) -> Result<Summary, ReconError> {
    let mut rows = load_rows(InputKind::Summary, csv_data, SUMMARY_COLUMNS, |row| {
        Ok(Summary {
            period_start: row.date("period_start")?,
            period_end: row.date("period_end")?,
            beginning_value_period: row.decimal("beginning_value_period")?,
            additions_period: row.decimal("additions_period")?,
            subtractions_period: row.decimal("subtractions_period")?,
            change_investment_value_period: row.decimal("change_investment_value_period")?,
            ending_value_period: row.decimal("ending_value_period")?,
            beginning_value_ytd: row.decimal("beginning_value_ytd")?,
            additions_ytd: row.decimal("additions_ytd")?,
            subtractions_ytd: row.decimal("subtractions_ytd")?,
            change_investment_value_ytd: row.decimal("change_investment_value_ytd")?,
            ending_value_ytd: row.decimal("ending_value_ytd")?,
            income_period: row.decimal("income_period")?,
            income_ytd: row.decimal("income_ytd")?,
        })
    })?;
    match rows.len() {
        1 => Ok(rows.remove(0)),
        found => Err(ReconError::SummaryRowCount { found }),
    }
}

/// Read an input file. A file that does not exist is `MissingInput`.
pub fn read_input(kind: InputKind, path: &Path) -> Result<String, ReconError> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReconError::MissingInput {
            kind,
            detail: path.display().to_string(),
        }),
        Err(e) => Err(ReconError::Io(format!("{}: {e}", path.display()))),
    }
}
