//! Ticker → ledger account name lookup.

use std::collections::BTreeMap;

use crate::error::{InputKind, ReconError};

const ACCOUNT_NAME_COLUMN: &str = "Account Name";

/// Resolves a ticker symbol to the ledger account that carries it.
pub trait AccountLookup {
    fn account_for(&self, symbol: &str) -> Option<&str>;

    /// Account name, or the raw symbol when the chart has no such account.
    fn account_or_symbol<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.account_for(symbol).unwrap_or(symbol)
    }
}

/// Security accounts from a chart-of-accounts export. Account names carry
/// their ticker in the last parenthesised group: `Equities - Xylem (XYL)`.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    by_symbol: BTreeMap<String, String>,
}

impl ChartOfAccounts {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_account_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_symbol = BTreeMap::new();
        for name in names {
            let name = name.into();
            if let Some(ticker) = ticker_of(&name) {
                by_symbol.insert(ticker.to_string(), name);
            }
        }
        Self { by_symbol }
    }

    /// Parse a chart-of-accounts CSV. Only the `Account Name` column is read;
    /// accounts without a ticker are skipped.
    pub fn from_csv(csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let name_idx = reader
            .headers()?
            .iter()
            .position(|h| h.trim() == ACCOUNT_NAME_COLUMN)
            .ok_or_else(|| ReconError::MissingColumn {
                kind: InputKind::ChartOfAccounts,
                column: ACCOUNT_NAME_COLUMN.into(),
            })?;

        let mut names = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(name) = record.get(name_idx) {
                names.push(name.to_string());
            }
        }
        Ok(Self::from_account_names(names))
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl AccountLookup for ChartOfAccounts {
    fn account_for(&self, symbol: &str) -> Option<&str> {
        self.by_symbol.get(symbol).map(String::as_str)
    }
}

/// Ticker inside the last `(...)` of an account name.
pub fn ticker_of(account_name: &str) -> Option<&str> {
    let start = account_name.rfind('(')?;
    let end = account_name.rfind(')')?;
    if end <= start + 1 {
        return None;
    }
    Some(account_name[start + 1..end].trim()).filter(|t| !t.is_empty())
}
