//! Reconciliation check: does the statement's change in investment value
//! equal cash dividends plus market movement of the holdings?

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::InputKind;
use crate::model::{is_material, IncomeTransaction, StatementInput};
use crate::valuation::Valuation;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    /// Statement-reported change in investment value.
    pub expected: Option<Decimal>,
    /// Non-reinvestment income plus total holdings change.
    pub actual: Option<Decimal>,
    pub difference: Option<Decimal>,
    pub validated: bool,
    /// Inputs that were missing or malformed. Non-empty means not validated.
    pub unavailable: Vec<InputKind>,
}

impl Validation {
    /// Never fails: an unavailable input yields `validated == false`.
    /// `valuation` is the period's valuation, or the input that prevented it.
    pub fn check(input: &StatementInput, valuation: Result<&Valuation, InputKind>) -> Self {
        let mut unavailable = Vec::new();

        let expected = input
            .summary
            .loaded()
            .map(|s| s.change_investment_value_period);
        if expected.is_none() {
            unavailable.push(InputKind::Summary);
        }

        let dividends = input.income.loaded().map(|rows| cash_income(rows));
        if dividends.is_none() {
            unavailable.push(InputKind::Income);
        }

        let holdings_change = match valuation {
            Ok(v) => Some(v.total_change()),
            Err(kind) => {
                unavailable.push(kind);
                None
            }
        };

        let actual = dividends.zip(holdings_change).map(|(d, h)| d + h);
        let difference = expected.zip(actual).map(|(e, a)| e - a);
        let validated = difference.is_some_and(|d| !is_material(d));

        Self {
            expected,
            actual,
            difference,
            validated,
            unavailable,
        }
    }
}

/// Cash income for the period; reinvested distributions excluded.
pub fn cash_income(income: &[IncomeTransaction]) -> Decimal {
    income
        .iter()
        .filter(|t| !t.is_reinvestment())
        .map(|t| t.amount)
        .sum()
}
