//! Change in value attributable to the current period.
//!
//! Purchase and sale cash flows are removed from each position so that what
//! remains is market movement. Securities sold out entirely during the period
//! are valued against the prior period's closing snapshot.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::classify::BasketClassifier;
use crate::error::{InputKind, ReconError};
use crate::model::{
    is_material, ActivityTransaction, HoldingPosition, RecordSet, StatementInput, TradeAction,
    ValueBasis,
};

/// Period trade cash flows for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TradeFlows {
    pub purchases: Decimal,
    pub sale_proceeds: Decimal,
}

/// Sum bought and sold amounts per symbol. Non-trade activity is ignored.
pub fn trade_flows(activity: &[ActivityTransaction]) -> BTreeMap<String, TradeFlows> {
    let mut flows: BTreeMap<String, TradeFlows> = BTreeMap::new();
    for txn in activity {
        match txn.action {
            TradeAction::Bought => {
                flows.entry(txn.symbol.clone()).or_default().purchases += txn.amount;
            }
            TradeAction::Sold => {
                flows.entry(txn.symbol.clone()).or_default().sale_proceeds += txn.amount;
            }
            TradeAction::Other(_) => {}
        }
    }
    flows
}

/// Change in value of a position still held at period end.
///
/// | basis        | change                                        |
/// |--------------|-----------------------------------------------|
/// | money market | 0                                             |
/// | existing     | ending − beginning − purchases + sale proceeds |
/// | new          | ending − cost basis                           |
/// | unavailable  | 0                                             |
pub fn holding_change(holding: &HoldingPosition, flows: Option<&TradeFlows>) -> Decimal {
    match holding.basis() {
        ValueBasis::MoneyMarket | ValueBasis::Unavailable => Decimal::ZERO,
        ValueBasis::NewPosition { cost_basis } => holding.ending_value - cost_basis,
        ValueBasis::Existing { beginning_value } => {
            let flows = flows.copied().unwrap_or_default();
            holding.ending_value - beginning_value - flows.purchases + flows.sale_proceeds
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingChange {
    pub symbol: String,
    pub basket_id: Option<String>,
    pub basis: ValueBasis,
    pub ending_value: Decimal,
    /// Flows subtracted from the raw change. Zero unless the basis is existing.
    pub flows: TradeFlows,
    pub change: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidationChange {
    pub symbol: String,
    pub basket_id: Option<String>,
    pub proceeds: Decimal,
    /// Closing value in the prior period's snapshot, when one exists.
    pub prior_value: Option<Decimal>,
    /// `proceeds − prior_value`. None excludes the liquidation from
    /// mark-to-market; the sale itself is still booked.
    pub period_change: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasketChange {
    pub id: String,
    pub name: String,
    /// Unrounded accumulated change.
    pub change: Decimal,
    pub material: bool,
}

/// Per-holding, per-liquidation and per-basket change for one period.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Valuation {
    pub holdings: Vec<HoldingChange>,
    pub liquidations: Vec<LiquidationChange>,
    pub baskets: Vec<BasketChange>,
}

/// Why a period could not be valued.
#[derive(Debug, Clone, Copy)]
pub enum ValuationGap<'a> {
    /// No holdings snapshot for the period.
    NoHoldings,
    /// An input the valuation reads failed to parse.
    Malformed(InputKind, &'a ReconError),
}

impl ValuationGap<'_> {
    /// The record set that made valuation impossible.
    pub fn input(&self) -> InputKind {
        match self {
            Self::NoHoldings => InputKind::Holdings,
            Self::Malformed(kind, _) => *kind,
        }
    }
}

impl Valuation {
    /// Value the period from the loaded record sets. Holdings are required;
    /// missing activity or prior holdings count as empty, malformed ones
    /// leave the period unvalued.
    pub fn for_period<'a>(
        input: &'a StatementInput,
        classifier: &BasketClassifier<'_>,
    ) -> Result<Self, ValuationGap<'a>> {
        let holdings = match &input.holdings {
            RecordSet::Loaded(rows) => rows.as_slice(),
            RecordSet::Missing => return Err(ValuationGap::NoHoldings),
            RecordSet::Malformed(err) => {
                return Err(ValuationGap::Malformed(InputKind::Holdings, err))
            }
        };
        let activity: &[ActivityTransaction] = match &input.activity {
            RecordSet::Loaded(rows) => rows,
            RecordSet::Missing => &[],
            RecordSet::Malformed(err) => {
                return Err(ValuationGap::Malformed(InputKind::Activity, err))
            }
        };
        let prior = match &input.prior_holdings {
            RecordSet::Loaded(rows) => Some(rows.as_slice()),
            RecordSet::Missing => None,
            RecordSet::Malformed(err) => {
                return Err(ValuationGap::Malformed(InputKind::PriorHoldings, err))
            }
        };
        Ok(Self::compute(holdings, activity, prior, classifier))
    }

    pub fn compute(
        holdings: &[HoldingPosition],
        activity: &[ActivityTransaction],
        prior_holdings: Option<&[HoldingPosition]>,
        classifier: &BasketClassifier<'_>,
    ) -> Self {
        let flows = trade_flows(activity);
        let mut basket_totals: BTreeMap<&str, (&str, Decimal)> = BTreeMap::new();

        // Flows belong to the symbol, not to a row: apply them once.
        let mut flows_applied: HashSet<&str> = HashSet::new();
        let mut held = Vec::with_capacity(holdings.len());
        for holding in holdings {
            let basis = holding.basis();
            let is_existing = matches!(basis, ValueBasis::Existing { .. });
            let symbol_flows = if is_existing && flows_applied.insert(holding.symbol.as_str()) {
                flows.get(&holding.symbol).copied().unwrap_or_default()
            } else {
                TradeFlows::default()
            };
            let change = holding_change(holding, Some(&symbol_flows));
            let basket = classifier.basket_for(&holding.symbol);
            if let Some(basket) = basket {
                basket_totals
                    .entry(basket.id.as_str())
                    .or_insert((basket.name.as_str(), Decimal::ZERO))
                    .1 += change;
            }
            held.push(HoldingChange {
                symbol: holding.symbol.clone(),
                basket_id: basket.map(|b| b.id.clone()),
                basis,
                ending_value: holding.ending_value,
                flows: symbol_flows,
                change,
            });
        }

        let held_symbols: HashSet<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        let mut prior_values: BTreeMap<&str, Decimal> = BTreeMap::new();
        for holding in prior_holdings.unwrap_or(&[]) {
            *prior_values.entry(holding.symbol.as_str()).or_default() += holding.ending_value;
        }

        let mut liquidations = Vec::new();
        for (symbol, symbol_flows) in &flows {
            if symbol_flows.sale_proceeds.is_zero()
                || held_symbols.contains(symbol.as_str())
                || classifier.is_money_market_symbol(symbol)
            {
                continue;
            }
            let prior_value = prior_values.get(symbol.as_str()).copied();
            let period_change = prior_value.map(|prior| symbol_flows.sale_proceeds - prior);
            let basket = classifier.basket_for(symbol);
            if let (Some(basket), Some(change)) = (basket, period_change) {
                basket_totals
                    .entry(basket.id.as_str())
                    .or_insert((basket.name.as_str(), Decimal::ZERO))
                    .1 += change;
            }
            if prior_value.is_none() {
                log::warn!(
                    "{symbol}: sold out this period but absent from prior holdings; \
                     excluded from mark-to-market"
                );
            }
            liquidations.push(LiquidationChange {
                symbol: symbol.clone(),
                basket_id: basket.map(|b| b.id.clone()),
                proceeds: symbol_flows.sale_proceeds,
                prior_value,
                period_change,
            });
        }

        let baskets = basket_totals
            .into_iter()
            .map(|(id, (name, change))| BasketChange {
                id: id.to_string(),
                name: name.to_string(),
                change,
                material: is_material(change),
            })
            .collect();

        Self {
            holdings: held,
            liquidations,
            baskets,
        }
    }

    pub fn held_change(&self) -> Decimal {
        self.holdings.iter().map(|h| h.change).sum()
    }

    pub fn liquidation_change(&self) -> Decimal {
        self.liquidations.iter().filter_map(|l| l.period_change).sum()
    }

    /// Market movement across every position, mapped to a basket or not.
    pub fn total_change(&self) -> Decimal {
        self.held_change() + self.liquidation_change()
    }

    pub fn material_baskets(&self) -> impl Iterator<Item = &BasketChange> {
        self.baskets.iter().filter(|b| b.material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BooksConfig;
    use crate::model::BeginningValue;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn config() -> BooksConfig {
        BooksConfig::from_toml(
            r#"
name = "Test"
money_market_symbols = ["SPAXX"]

[[baskets]]
id = "B1"
name = "Water"
fmv_adjustment_account = "Water - FMV"
unrealized_gain_account = "Water - Unrealized"
income_account = "Water - Income"
symbols = ["AWK", "XYL", "CWT"]
"#,
        )
        .unwrap()
    }

    fn holding(symbol: &str, beginning: Option<Decimal>, ending: Decimal, cost: Option<Decimal>) -> HoldingPosition {
        HoldingPosition {
            symbol: symbol.into(),
            description: String::new(),
            quantity: dec!(1),
            price: ending,
            beginning_value: beginning.map_or(BeginningValue::NotReported, BeginningValue::Reported),
            ending_value: ending,
            cost_basis: cost,
            unrealized_gain: None,
        }
    }

    fn trade(action: &str, symbol: &str, amount: Decimal) -> ActivityTransaction {
        ActivityTransaction {
            settlement_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            action: TradeAction::parse(action),
            symbol: symbol.into(),
            security_name: String::new(),
            quantity: None,
            price: None,
            amount,
            transaction_cost: None,
            basket: String::new(),
            cost_basis: None,
        }
    }

    #[test]
    fn money_market_never_moves() {
        let h = holding("SPAXX", Some(dec!(500)), dec!(800), None);
        let flows = TradeFlows { purchases: dec!(300), sale_proceeds: Decimal::ZERO };
        assert_eq!(holding_change(&h, Some(&flows)), Decimal::ZERO);
    }

    #[test]
    fn new_position_is_ending_minus_cost() {
        let h = holding("AWK", None, dec!(1012.34), Some(dec!(1000.00)));
        let flows = TradeFlows { purchases: dec!(1000.00), sale_proceeds: Decimal::ZERO };
        // No purchase adjustment: cost basis already is the purchase.
        assert_eq!(holding_change(&h, Some(&flows)), dec!(12.34));
    }

    #[test]
    fn existing_position_without_activity() {
        let h = holding("AWK", Some(dec!(900)), dec!(1000), Some(dec!(850)));
        assert_eq!(holding_change(&h, None), dec!(100));
    }

    #[test]
    fn existing_position_removes_trade_flows() {
        let h = holding("AWK", Some(dec!(900)), dec!(1450), Some(dec!(850)));
        let flows = TradeFlows { purchases: dec!(500), sale_proceeds: dec!(120) };
        // 1450 - 900 - 500 + 120
        assert_eq!(holding_change(&h, Some(&flows)), dec!(170));
    }

    #[test]
    fn negative_beginning_value_contributes_nothing() {
        let h = holding("AWK", Some(dec!(-1)), dec!(1000), Some(dec!(850)));
        assert_eq!(holding_change(&h, None), Decimal::ZERO);
    }

    #[test]
    fn basket_totals_include_liquidations() {
        let config = config();
        let classifier = BasketClassifier::new(&config);
        let holdings = vec![
            holding("AWK", Some(dec!(900)), dec!(1000), Some(dec!(800))),
            holding("ZZZ", Some(dec!(100)), dec!(90), Some(dec!(80))),
            holding("SPAXX", Some(dec!(50)), dec!(75), None),
        ];
        let activity = vec![trade("You Sold", "XYL", dec!(530)), trade("You Sold", "SPAXX", dec!(5))];
        let prior = vec![holding("XYL", Some(dec!(480)), dec!(500), Some(dec!(400)))];

        let v = Valuation::compute(&holdings, &activity, Some(&prior), &classifier);

        assert_eq!(v.liquidations.len(), 1);
        assert_eq!(v.liquidations[0].period_change, Some(dec!(30)));
        assert_eq!(v.baskets.len(), 1);
        assert_eq!(v.baskets[0].change, dec!(130));
        assert!(v.baskets[0].material);
        // Unmapped ZZZ still counts toward the total change.
        assert_eq!(v.total_change(), dec!(100) - dec!(10) + dec!(30));
    }

    #[test]
    fn liquidation_without_prior_value_is_excluded() {
        let config = config();
        let classifier = BasketClassifier::new(&config);
        let activity = vec![trade("You Sold", "CWT", dec!(250))];

        let v = Valuation::compute(&[], &activity, None, &classifier);

        assert_eq!(v.liquidations.len(), 1);
        assert_eq!(v.liquidations[0].prior_value, None);
        assert_eq!(v.liquidations[0].period_change, None);
        assert!(v.baskets.is_empty());
        assert_eq!(v.total_change(), Decimal::ZERO);
    }

    #[test]
    fn partial_sale_is_not_a_liquidation() {
        let config = config();
        let classifier = BasketClassifier::new(&config);
        let holdings = vec![holding("AWK", Some(dec!(1000)), dec!(560), Some(dec!(800)))];
        let activity = vec![trade("You Sold", "AWK", dec!(450))];

        let v = Valuation::compute(&holdings, &activity, None, &classifier);

        assert!(v.liquidations.is_empty());
        // 560 - 1000 + 450
        assert_eq!(v.baskets[0].change, dec!(10));
    }

    #[test]
    fn immaterial_basket_is_flagged() {
        let config = config();
        let classifier = BasketClassifier::new(&config);
        let holdings = vec![holding("AWK", Some(dec!(1000)), dec!(1000.009999), Some(dec!(800)))];

        let v = Valuation::compute(&holdings, &[], None, &classifier);

        assert_eq!(v.baskets[0].change, dec!(0.009999));
        assert!(!v.baskets[0].material);
        assert_eq!(v.material_baskets().count(), 0);
    }

    fn period_input() -> StatementInput {
        let mut input =
            StatementInput::new(crate::model::StatementPeriod::new(2025, 5).unwrap());
        input.holdings = RecordSet::Loaded(vec![holding(
            "AWK",
            Some(dec!(900)),
            dec!(1000),
            Some(dec!(800)),
        )]);
        input
    }

    #[test]
    fn for_period_treats_missing_flows_as_empty() {
        let config = config();
        let classifier = BasketClassifier::new(&config);
        let v = Valuation::for_period(&period_input(), &classifier).unwrap();
        assert_eq!(v.total_change(), dec!(100));
    }

    #[test]
    fn for_period_names_the_input_it_lacked() {
        let config = config();
        let classifier = BasketClassifier::new(&config);

        let mut input = period_input();
        input.holdings = RecordSet::Missing;
        let gap = Valuation::for_period(&input, &classifier).unwrap_err();
        assert!(matches!(gap, ValuationGap::NoHoldings));
        assert_eq!(gap.input(), InputKind::Holdings);

        let mut input = period_input();
        input.activity = RecordSet::Malformed(ReconError::malformed(
            InputKind::Activity,
            3,
            "amount",
            "n/a",
        ));
        let gap = Valuation::for_period(&input, &classifier).unwrap_err();
        assert_eq!(gap.input(), InputKind::Activity);

        // Activity is fine; only the prior snapshot is broken.
        let mut input = period_input();
        input.activity = RecordSet::Loaded(Vec::new());
        input.prior_holdings = RecordSet::Malformed(ReconError::malformed(
            InputKind::PriorHoldings,
            1,
            "ending_value",
            "?",
        ));
        let gap = Valuation::for_period(&input, &classifier).unwrap_err();
        assert_eq!(gap.input(), InputKind::PriorHoldings);
    }
}
