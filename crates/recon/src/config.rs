use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Production basket and account table.
const BUILTIN_TOML: &str = include_str!("../config/builtin.books.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Ledger layout for one brokerage account: account names, journal numbering
/// prefix, money-market symbols and the basket table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BooksConfig {
    pub name: String,
    #[serde(default = "default_money_market_symbols")]
    pub money_market_symbols: Vec<String>,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub baskets: Vec<Basket>,
}

// ---------------------------------------------------------------------------
// Journal numbering + fixed ledger accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    /// Prepended to every journal suffix, e.g. `MMW-` → `MMW-10001`.
    #[serde(default = "default_journal_prefix")]
    pub prefix: String,
    /// Statement and entry file name prefix, e.g. `MMW` → `MMW-2025-05-DIV.csv`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            prefix: default_journal_prefix(),
            file_prefix: default_file_prefix(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountsConfig {
    #[serde(default = "default_cash_account")]
    pub cash: String,
    #[serde(default = "default_dividend_income_account")]
    pub dividend_income: String,
    /// Realized gain/loss account for sales whose basket tag is not a known basket.
    #[serde(default = "default_sale_income_account")]
    pub sale_income: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            cash: default_cash_account(),
            dividend_income: default_dividend_income_account(),
            sale_income: default_sale_income_account(),
        }
    }
}

fn default_journal_prefix() -> String {
    "MMW-".into()
}

fn default_file_prefix() -> String {
    "MMW".into()
}

fn default_currency() -> String {
    "USD".into()
}

fn default_cash_account() -> String {
    "Cash - Fidelity Cash Management Account".into()
}

fn default_dividend_income_account() -> String {
    "Income - Ordinary Dividends".into()
}

fn default_sale_income_account() -> String {
    "Income - Equity Securities".into()
}

fn default_money_market_symbols() -> Vec<String> {
    vec!["FDRXX".into(), "SPAXX".into(), "FCASH".into()]
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

/// A named group of symbols sharing one FMV-adjustment / unrealized-gain pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Basket {
    pub id: String,
    pub name: String,
    pub fmv_adjustment_account: String,
    pub unrealized_gain_account: String,
    /// Realized gain/loss account for sales tagged with this basket id.
    pub income_account: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl BooksConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: BooksConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The basket table the books were set up with.
    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(BUILTIN_TOML)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.journal.prefix.is_empty() {
            return Err(ReconError::ConfigValidation(
                "journal.prefix must not be empty".into(),
            ));
        }

        for (field, value) in [
            ("accounts.cash", &self.accounts.cash),
            ("accounts.dividend_income", &self.accounts.dividend_income),
            ("accounts.sale_income", &self.accounts.sale_income),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{field} must not be empty"
                )));
            }
        }

        let money_market: HashSet<&str> =
            self.money_market_symbols.iter().map(String::as_str).collect();
        let mut basket_ids = HashSet::new();
        let mut owner: HashMap<&str, &str> = HashMap::new();

        for basket in &self.baskets {
            if basket.id.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "basket '{}': id must not be empty",
                    basket.name
                )));
            }
            if !basket_ids.insert(basket.id.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate basket id '{}'",
                    basket.id
                )));
            }
            for (field, value) in [
                ("fmv_adjustment_account", &basket.fmv_adjustment_account),
                ("unrealized_gain_account", &basket.unrealized_gain_account),
                ("income_account", &basket.income_account),
            ] {
                if value.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "basket '{}': {field} must not be empty",
                        basket.id
                    )));
                }
            }
            for symbol in &basket.symbols {
                if money_market.contains(symbol.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "basket '{}': '{symbol}' is a money-market symbol",
                        basket.id
                    )));
                }
                if let Some(previous) = owner.insert(symbol.as_str(), basket.id.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "symbol '{symbol}' is in baskets '{previous}' and '{}'",
                        basket.id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn symbol_count(&self) -> usize {
        self.baskets.iter().map(|b| b.symbols.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
