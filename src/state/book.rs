#![allow(dead_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// A single aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Aggregated order book for a single symbol.
///
/// Both sides are `BTreeMap<Decimal, Decimal>` (price -> size). `Decimal`
/// keys keep price comparison exact: `100` and `100.0` are the same key,
/// which f64 or string keys would not guarantee.
///
/// Invariants, upheld by the mutators below:
/// - a stored size is never zero (a zero-size level is absent);
/// - a price is present in at most one side at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    /// Identifier of the most recently applied batch. `None` until the
    /// first batch after a reset.
    last_update_id: Option<u64>,
}

impl Book {
    /// Creates an empty book, as at subscription start.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_update_id(&self) -> Option<u64> {
        self.last_update_id
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Size resting at `price` on the bid side, if any.
    pub fn bid_size(&self, price: Decimal) -> Option<Decimal> {
        self.bids.get(&price).copied()
    }

    /// Size resting at `price` on the ask side, if any.
    pub fn ask_size(&self, price: Decimal) -> Option<Decimal> {
        self.asks.get(&price).copied()
    }

    /// Best (highest) bid.
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Best (lowest) ask.
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks
            .iter()
            .next()
            .map(|(price, size)| PriceLevel::new(*price, *size))
    }

    /// Mid price, when both sides are populated.
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some((bid.price + ask.price) / Decimal::TWO)
    }

    /// Best ask minus best bid, when both sides are populated.
    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Top `n` bids, highest price first.
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(price, size)| PriceLevel::new(*price, *size))
            .collect()
    }

    /// Top `n` asks, lowest price first.
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .take(n)
            .map(|(price, size)| PriceLevel::new(*price, *size))
            .collect()
    }

    /// Writes a bid level, evicting any stale ask at the same price so the
    /// single-side invariant holds even across a feed inconsistency.
    pub(crate) fn set_bid(&mut self, price: Decimal, size: Decimal) {
        self.asks.remove(&price);
        self.bids.insert(price, size);
    }

    /// Writes an ask level, evicting any stale bid at the same price.
    pub(crate) fn set_ask(&mut self, price: Decimal, size: Decimal) {
        self.bids.remove(&price);
        self.asks.insert(price, size);
    }

    /// Removes `price` from whichever side holds it. Removing an absent
    /// level is a no-op.
    pub(crate) fn remove_level(&mut self, price: Decimal) {
        self.bids.remove(&price);
        self.asks.remove(&price);
    }

    pub(crate) fn set_last_update_id(&mut self, update_id: u64) {
        self.last_update_id = Some(update_id);
    }
}
