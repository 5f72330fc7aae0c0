use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::classify::BasketClassifier;
use crate::model::{ActivityTransaction, IncomeTransaction, TradeAction};

/// Trade journals are keyed by (settlement date, basket tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeGroupKey {
    pub settlement_date: NaiveDate,
    pub basket: String,
}

/// Group cash income by settlement date. Reinvestments are dropped.
pub fn group_income(income: &[IncomeTransaction]) -> BTreeMap<NaiveDate, Vec<&IncomeTransaction>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&IncomeTransaction>> = BTreeMap::new();
    for txn in income.iter().filter(|t| !t.is_reinvestment()) {
        groups.entry(txn.settlement_date).or_default().push(txn);
    }
    groups
}

/// Group trades of one direction by (date, basket tag), skipping money-market sweeps.
/// Input order is kept within each group.
pub fn group_trades<'a>(
    activity: &'a [ActivityTransaction],
    action: &TradeAction,
    classifier: &BasketClassifier<'_>,
) -> BTreeMap<TradeGroupKey, Vec<&'a ActivityTransaction>> {
    let mut groups: BTreeMap<TradeGroupKey, Vec<&ActivityTransaction>> = BTreeMap::new();
    for txn in activity {
        if &txn.action != action || classifier.is_money_market_symbol(&txn.symbol) {
            continue;
        }
        let key = TradeGroupKey {
            settlement_date: txn.settlement_date,
            basket: txn.basket.clone(),
        };
        groups.entry(key).or_default().push(txn);
    }
    groups
}

/// Per-symbol sale totals inside one sale group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaleTotals {
    pub proceeds: Decimal,
    /// A sale reported without cost basis is carried at its proceeds.
    pub cost_basis: Decimal,
    pub quantity: Decimal,
}

pub fn sale_totals_by_symbol(sales: &[&ActivityTransaction]) -> BTreeMap<String, SaleTotals> {
    let mut totals: BTreeMap<String, SaleTotals> = BTreeMap::new();
    for txn in sales {
        let entry = totals.entry(txn.symbol.clone()).or_default();
        entry.proceeds += txn.amount;
        entry.cost_basis += txn.cost_basis.unwrap_or(txn.amount);
        entry.quantity += txn.quantity.unwrap_or_default();
    }
    totals
}

/// "ABC, XYZ": sorted, de-duplicated symbols for notes and descriptions.
pub fn symbol_list<'a>(symbols: impl IntoIterator<Item = &'a str>) -> String {
    symbols
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BooksConfig;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn income(day: &str, symbol: &str, description: &str, amount: Decimal) -> IncomeTransaction {
        IncomeTransaction {
            settlement_date: date(day),
            security_name: String::new(),
            symbol: symbol.into(),
            cusip: String::new(),
            description: description.into(),
            quantity: None,
            price: None,
            amount,
        }
    }

    fn trade(day: &str, action: &str, symbol: &str, basket: &str, amount: Decimal) -> ActivityTransaction {
        ActivityTransaction {
            settlement_date: date(day),
            action: TradeAction::parse(action),
            symbol: symbol.into(),
            security_name: String::new(),
            quantity: Some(dec!(2)),
            price: None,
            amount,
            transaction_cost: None,
            basket: basket.into(),
            cost_basis: None,
        }
    }

    #[test]
    fn income_grouped_by_date_without_reinvestment() {
        let rows = vec![
            income("2025-05-15", "JEPI", "Dividend Received", dec!(12.50)),
            income("2025-05-02", "AWK", "Dividend Received", dec!(8.00)),
            income("2025-05-15", "JEPI", "Reinvestment", dec!(-12.50)),
            income("2025-05-15", "QYLD", "Dividend Received", dec!(4.10)),
        ];
        let groups = group_income(&rows);
        let dates: Vec<_> = groups.keys().copied().collect();
        assert_eq!(dates, vec![date("2025-05-02"), date("2025-05-15")]);
        assert_eq!(groups[&date("2025-05-15")].len(), 2);
    }

    #[test]
    fn trades_grouped_by_date_and_basket() {
        let config = BooksConfig::builtin().unwrap();
        let classifier = BasketClassifier::new(&config);
        let rows = vec![
            trade("2025-05-10", "You Bought", "AWK", "10001", dec!(100)),
            trade("2025-05-10", "You Bought", "XYL", "10001", dec!(200)),
            trade("2025-05-10", "You Bought", "BX", "", dec!(300)),
            trade("2025-05-10", "You Sold", "KKR", "", dec!(400)),
            trade("2025-05-10", "You Bought", "SPAXX", "", dec!(999)),
        ];
        let groups = group_trades(&rows, &TradeAction::Bought, &classifier);
        let keys: Vec<_> = groups.keys().map(|k| k.basket.as_str()).collect();
        // Empty tag sorts first.
        assert_eq!(keys, vec!["", "10001"]);
        let untagged = &groups[&TradeGroupKey {
            settlement_date: date("2025-05-10"),
            basket: String::new(),
        }];
        assert_eq!(untagged.len(), 1);
        assert_eq!(untagged[0].symbol, "BX");
    }

    #[test]
    fn sale_totals_fall_back_to_proceeds_for_cost() {
        let mut with_cost = trade("2025-05-12", "You Sold", "AWK", "", dec!(150));
        with_cost.cost_basis = Some(dec!(120));
        let without_cost = trade("2025-05-12", "You Sold", "AWK", "", dec!(50));
        let sales = vec![&with_cost, &without_cost];

        let totals = sale_totals_by_symbol(&sales);
        let awk = totals["AWK"];
        assert_eq!(awk.proceeds, dec!(200));
        assert_eq!(awk.cost_basis, dec!(170));
        assert_eq!(awk.quantity, dec!(4));
    }

    #[test]
    fn symbol_list_is_sorted_and_unique() {
        assert_eq!(symbol_list(["XYL", "AWK", "XYL"]), "AWK, XYL");
        assert_eq!(symbol_list(std::iter::empty::<&str>()), "");
    }
}
