//! Journal entry builders, one per entry block.
//!
//! Every line amount is rounded to the cent before the balancing line is
//! derived from the rounded lines, so each journal number balances exactly.
//! Zero-valued lines are never emitted. A negative amount lands on the
//! opposite side of the line's natural side.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::accounts::AccountLookup;
use crate::aggregate::{group_income, group_trades, sale_totals_by_symbol, symbol_list};
use crate::classify::BasketClassifier;
use crate::config::BooksConfig;
use crate::model::{
    fixed, is_material, round_cents, ActivityTransaction, EntryBlock, EntrySide,
    IncomeTransaction, JournalEntry, TradeAction,
};
use crate::valuation::Valuation;

/// Journal suffixes for one block invocation: base, base + 1, ...
#[derive(Debug, Clone)]
pub struct JournalSequence {
    next: u32,
}

impl JournalSequence {
    pub fn starting_at(base: u32) -> Self {
        Self { next: base }
    }

    pub fn for_block(block: EntryBlock) -> Self {
        Self::starting_at(block.base_suffix())
    }

    pub fn next_suffix(&mut self) -> u32 {
        let suffix = self.next;
        self.next += 1;
        suffix
    }
}

/// Which side a positive amount goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Natural {
    Debit,
    Credit,
}

fn side(amount: Decimal, natural: Natural) -> EntrySide {
    match (natural, amount.is_sign_negative()) {
        (Natural::Debit, false) | (Natural::Credit, true) => EntrySide::Debit(amount.abs()),
        (Natural::Credit, false) | (Natural::Debit, true) => EntrySide::Credit(amount.abs()),
    }
}

/// Shared header of all lines in one journal.
struct Header {
    date: NaiveDate,
    reference: String,
    suffix: u32,
    notes: String,
}

/// One line waiting for its header.
struct Line {
    account: String,
    description: String,
    amount: Decimal,
    natural: Natural,
}

impl Line {
    fn new(account: &str, description: String, amount: Decimal, natural: Natural) -> Self {
        Self {
            account: account.to_string(),
            description,
            amount: round_cents(amount),
            natural,
        }
    }
}

pub struct JournalBuilder<'a> {
    config: &'a BooksConfig,
    classifier: BasketClassifier<'a>,
    accounts: &'a dyn AccountLookup,
}

impl<'a> JournalBuilder<'a> {
    pub fn new(config: &'a BooksConfig, accounts: &'a dyn AccountLookup) -> Self {
        Self {
            config,
            classifier: BasketClassifier::new(config),
            accounts,
        }
    }

    pub fn classifier(&self) -> &BasketClassifier<'a> {
        &self.classifier
    }

    fn emit(&self, header: &Header, lines: Vec<Line>, out: &mut Vec<JournalEntry>) {
        for line in lines.into_iter().filter(|l| !l.amount.is_zero()) {
            out.push(JournalEntry {
                journal_date: header.date,
                reference_number: header.reference.clone(),
                journal_prefix: self.config.journal.prefix.clone(),
                journal_suffix: header.suffix,
                notes: header.notes.clone(),
                account: line.account,
                description: line.description,
                side: side(line.amount, line.natural),
                currency: self.config.journal.currency.clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Dividends (10001+)
    // -----------------------------------------------------------------------

    /// One journal per settlement date: a cash debit per dividend and one
    /// income credit for the day's total.
    pub fn dividends(&self, income: &[IncomeTransaction]) -> Vec<JournalEntry> {
        let mut seq = JournalSequence::for_block(EntryBlock::Dividends);
        let mut out = Vec::new();

        for (date, txns) in group_income(income) {
            let symbols = symbol_list(txns.iter().map(|t| t.symbol.as_str()));
            let mut lines: Vec<Line> = txns
                .iter()
                .map(|t| {
                    Line::new(
                        &self.config.accounts.cash,
                        format!("Dividend - {}", t.symbol),
                        t.amount,
                        Natural::Debit,
                    )
                })
                .collect();
            let total: Decimal = lines.iter().map(|l| l.amount).sum();
            if total.is_zero() {
                log::debug!("dividends {date}: nets to zero, no journal");
                continue;
            }
            lines.push(Line::new(
                &self.config.accounts.dividend_income,
                format!("Income - {symbols}"),
                total,
                Natural::Credit,
            ));

            let header = Header {
                date,
                reference: format!("DIV-{date}"),
                suffix: seq.next_suffix(),
                notes: format!("{date} Dividends - {symbols}"),
            };
            self.emit(&header, lines, &mut out);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Purchases (20001+)
    // -----------------------------------------------------------------------

    /// One journal per (date, basket tag): a debit to each security's account
    /// and one cash credit for the group total.
    pub fn purchases(&self, activity: &[ActivityTransaction]) -> Vec<JournalEntry> {
        let mut seq = JournalSequence::for_block(EntryBlock::Purchases);
        let mut out = Vec::new();

        for (key, txns) in group_trades(activity, &TradeAction::Bought, &self.classifier) {
            let date = key.settlement_date;
            let symbols = symbol_list(txns.iter().map(|t| t.symbol.as_str()));
            let mut lines: Vec<Line> = txns
                .iter()
                .map(|t| {
                    Line::new(
                        self.accounts.account_or_symbol(&t.symbol),
                        purchase_description(t),
                        t.amount,
                        Natural::Debit,
                    )
                })
                .collect();
            let total: Decimal = lines.iter().map(|l| l.amount).sum();
            if total.is_zero() {
                log::debug!("purchases {date}: nets to zero, no journal");
                continue;
            }
            lines.push(Line::new(
                &self.config.accounts.cash,
                format!("Cash for {symbols}"),
                total,
                Natural::Credit,
            ));

            let header = Header {
                date,
                reference: format!("PUR-{date}{}", tag_suffix(&key.basket)),
                suffix: seq.next_suffix(),
                notes: format!("{date} Purchase - {symbols}"),
            };
            self.emit(&header, lines, &mut out);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Sales (30001+)
    // -----------------------------------------------------------------------

    /// One journal per (date, basket tag):
    /// 1. cash debit for total proceeds,
    /// 2. per symbol, realized gain (credit) or loss (debit) to the income account,
    /// 3. per symbol, credit to the security's account for cost basis removed.
    pub fn sales(&self, activity: &[ActivityTransaction]) -> Vec<JournalEntry> {
        let mut seq = JournalSequence::for_block(EntryBlock::Sales);
        let mut out = Vec::new();

        for (key, txns) in group_trades(activity, &TradeAction::Sold, &self.classifier) {
            let date = key.settlement_date;
            let basket = self.classifier.basket_by_id(&key.basket);
            let income_account = basket
                .map(|b| b.income_account.as_str())
                .unwrap_or(&self.config.accounts.sale_income);
            let basket_label = basket.map(|b| format!("{} - ", b.name)).unwrap_or_default();
            let symbols = symbol_list(txns.iter().map(|t| t.symbol.as_str()));
            let totals = sale_totals_by_symbol(&txns);

            let mut proceeds_total = Decimal::ZERO;
            let mut gain_lines = Vec::new();
            let mut cost_lines = Vec::new();
            for (symbol, t) in &totals {
                let proceeds = round_cents(t.proceeds);
                let cost_basis = round_cents(t.cost_basis);
                let gain = proceeds - cost_basis;
                proceeds_total += proceeds;

                if is_material(gain) {
                    let label = if gain.is_sign_negative() { "Loss" } else { "Gain" };
                    gain_lines.push(Line::new(
                        income_account,
                        format!("Realized {label} - {symbol}"),
                        gain,
                        Natural::Credit,
                    ));
                }

                let avg_price = if t.quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    t.proceeds / t.quantity
                };
                cost_lines.push(Line::new(
                    self.accounts.account_or_symbol(symbol),
                    format!(
                        "Sale - {symbol} - {} @ ~ ${}",
                        fixed(t.quantity, 3),
                        fixed(avg_price, 2)
                    ),
                    cost_basis,
                    Natural::Credit,
                ));
            }

            let mut lines = Vec::with_capacity(1 + gain_lines.len() + cost_lines.len());
            lines.push(Line::new(
                &self.config.accounts.cash,
                format!("Proceeds from {basket_label}{symbols}"),
                proceeds_total,
                Natural::Debit,
            ));
            lines.extend(gain_lines);
            lines.extend(cost_lines);
            if lines.iter().all(|l| l.amount.is_zero()) {
                log::debug!("sales {date}: nets to zero, no journal");
                continue;
            }

            let header = Header {
                date,
                reference: format!("SAL-{date}{}", tag_suffix(&key.basket)),
                suffix: seq.next_suffix(),
                notes: format!("{date} Sale - {basket_label}{symbols}"),
            };
            self.emit(&header, lines, &mut out);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Unrealized / liquidation (40001+)
    // -----------------------------------------------------------------------

    /// One balanced pair per basket whose net change is material, dated at
    /// period end. Gains debit FMV adjustment and credit unrealized gain;
    /// losses the reverse.
    pub fn unrealized(&self, valuation: &Valuation, period_end: NaiveDate) -> Vec<JournalEntry> {
        let mut seq = JournalSequence::for_block(EntryBlock::Unrealized);
        let mut out = Vec::new();

        for change in valuation.material_baskets() {
            let Some(basket) = self.classifier.basket_by_id(&change.id) else {
                log::warn!("basket '{}' is not configured; mark-to-market skipped", change.id);
                continue;
            };
            let amount = round_cents(change.change).abs();
            let name = &basket.name;
            let lines = if change.change.is_sign_positive() {
                vec![
                    Line::new(
                        &basket.fmv_adjustment_account,
                        format!("FMV Adjustment - {name}"),
                        amount,
                        Natural::Debit,
                    ),
                    Line::new(
                        &basket.unrealized_gain_account,
                        format!("Unrealized Gain - {name}"),
                        amount,
                        Natural::Credit,
                    ),
                ]
            } else {
                vec![
                    Line::new(
                        &basket.unrealized_gain_account,
                        format!("Unrealized Loss - {name}"),
                        amount,
                        Natural::Debit,
                    ),
                    Line::new(
                        &basket.fmv_adjustment_account,
                        format!("FMV Adjustment - {name}"),
                        amount,
                        Natural::Credit,
                    ),
                ]
            };

            let header = Header {
                date: period_end,
                reference: format!("UNR-{period_end}-{}", basket.id),
                suffix: seq.next_suffix(),
                notes: format!("{period_end} Mark-to-Market - {name}"),
            };
            self.emit(&header, lines, &mut out);
        }
        out
    }
}

fn tag_suffix(tag: &str) -> String {
    if tag.is_empty() {
        String::new()
    } else {
        format!("-{tag}")
    }
}

fn purchase_description(txn: &ActivityTransaction) -> String {
    match (txn.quantity, txn.price) {
        (Some(quantity), Some(price)) if !quantity.is_zero() && !price.is_zero() => format!(
            "Purchase - {} - {} @ ~ ${}",
            txn.symbol,
            fixed(quantity, 3),
            fixed(price, 2)
        ),
        _ => format!("Purchase - {}", txn.symbol),
    }
}
