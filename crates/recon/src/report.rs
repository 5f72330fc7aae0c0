//! Diagnostic totals for one period. Nothing here feeds the journals.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::classify::BasketClassifier;
use crate::model::{ActivityTransaction, IncomeTransaction, RecordSetStatus, StatementInput, Summary, TradeAction};
use crate::validate::cash_income;
use crate::valuation::Valuation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputStatus {
    pub holdings: RecordSetStatus,
    pub prior_holdings: RecordSetStatus,
    pub income: RecordSetStatus,
    pub activity: RecordSetStatus,
    pub summary: RecordSetStatus,
}

impl Default for InputStatus {
    fn default() -> Self {
        Self {
            holdings: RecordSetStatus::Missing,
            prior_holdings: RecordSetStatus::Missing,
            income: RecordSetStatus::Missing,
            activity: RecordSetStatus::Missing,
            summary: RecordSetStatus::Missing,
        }
    }
}

/// Trade totals, money-market sweeps excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    pub purchases: usize,
    pub sales: usize,
    pub bought: Decimal,
    pub sold: Decimal,
    /// Sales reported without cost basis count at their proceeds.
    pub cost_basis_sold: Decimal,
    pub realized_gain: Decimal,
}

impl ActivityTotals {
    pub fn compute(activity: &[ActivityTransaction], classifier: &BasketClassifier<'_>) -> Self {
        let mut totals = Self::default();
        for txn in activity
            .iter()
            .filter(|t| !classifier.is_money_market_symbol(&t.symbol))
        {
            match txn.action {
                TradeAction::Bought => {
                    totals.purchases += 1;
                    totals.bought += txn.amount;
                }
                TradeAction::Sold => {
                    totals.sales += 1;
                    totals.sold += txn.amount;
                    totals.cost_basis_sold += txn.cost_basis.unwrap_or(txn.amount);
                }
                TradeAction::Other(_) => {}
            }
        }
        totals.realized_gain = totals.sold - totals.cost_basis_sold;
        totals
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncomeTotals {
    pub transactions: usize,
    pub dividends: Decimal,
    pub reinvestment: Decimal,
}

impl IncomeTotals {
    pub fn compute(income: &[IncomeTransaction]) -> Self {
        Self {
            transactions: income.len(),
            dividends: cash_income(income),
            reinvestment: income
                .iter()
                .filter(|t| t.is_reinvestment())
                .map(|t| t.amount)
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCheck {
    pub change_in_value: Decimal,
    pub income: Decimal,
    pub unrealized_gains: Decimal,
    pub internally_consistent: bool,
}

impl From<&Summary> for SummaryCheck {
    fn from(summary: &Summary) -> Self {
        Self {
            change_in_value: summary.change_investment_value_period,
            income: summary.income_period,
            unrealized_gains: summary.unrealized_gains(),
            internally_consistent: summary.is_internally_consistent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodReport {
    pub inputs: InputStatus,
    /// Absent when holdings could not be valued.
    pub valuation: Option<Valuation>,
    pub activity: Option<ActivityTotals>,
    pub income: Option<IncomeTotals>,
    pub summary: Option<SummaryCheck>,
}

impl PeriodReport {
    pub fn build(
        input: &StatementInput,
        valuation: Option<&Valuation>,
        classifier: &BasketClassifier<'_>,
    ) -> Self {
        let report = Self {
            inputs: InputStatus {
                holdings: input.holdings.status(),
                prior_holdings: input.prior_holdings.status(),
                income: input.income.status(),
                activity: input.activity.status(),
                summary: input.summary.status(),
            },
            valuation: valuation.cloned(),
            activity: input
                .activity
                .loaded()
                .map(|rows| ActivityTotals::compute(rows, classifier)),
            income: input.income.loaded().map(|rows| IncomeTotals::compute(rows)),
            summary: input.summary.loaded().map(SummaryCheck::from),
        };
        if let Some(check) = &report.summary {
            if !check.internally_consistent {
                log::warn!("{}: statement summary does not roll forward", input.period);
            }
        }
        report
    }
}
