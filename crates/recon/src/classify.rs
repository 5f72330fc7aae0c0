use std::collections::{HashMap, HashSet};

use crate::config::{Basket, BooksConfig};

/// Symbol → basket lookup over an injected config.
///
/// Unmapped symbols, money-market symbols included, have no basket and are
/// left out of basket aggregation and mark-to-market entries.
pub struct BasketClassifier<'a> {
    by_symbol: HashMap<&'a str, &'a Basket>,
    by_id: HashMap<&'a str, &'a Basket>,
    money_market: HashSet<&'a str>,
}

impl<'a> BasketClassifier<'a> {
    pub fn new(config: &'a BooksConfig) -> Self {
        let mut by_symbol = HashMap::new();
        let mut by_id = HashMap::new();
        for basket in &config.baskets {
            by_id.insert(basket.id.as_str(), basket);
            for symbol in &basket.symbols {
                by_symbol.insert(symbol.as_str(), basket);
            }
        }
        let money_market = config
            .money_market_symbols
            .iter()
            .map(String::as_str)
            .collect();
        Self {
            by_symbol,
            by_id,
            money_market,
        }
    }

    pub fn basket_for(&self, symbol: &str) -> Option<&'a Basket> {
        self.by_symbol.get(symbol).copied()
    }

    /// Resolve an activity basket tag (a basket id) to its basket.
    pub fn basket_by_id(&self, id: &str) -> Option<&'a Basket> {
        self.by_id.get(id).copied()
    }

    /// Activity rows carry no cost-basis flag, so money-market trades are
    /// recognised by symbol.
    pub fn is_money_market_symbol(&self, symbol: &str) -> bool {
        self.money_market.contains(symbol)
    }
}
