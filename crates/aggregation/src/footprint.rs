//! Footprint bar building from time-ordered trades.
//!
//! A [`FootprintBarBuilder`] owns at most one bar. It is *empty* until the
//! first trade arrives, *open* while trades inside its window keep coming,
//! and is *finalized* by [`FootprintBarBuilder::finalize`], which consumes
//! the builder so the bar cannot change afterwards.

use crate::bucket::PriceBucketer;
use footprint_core::{floor_to, FootprintBar, PriceLevel, SymbolConfig, Trade};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Builder for a single footprint bar.
#[derive(Debug, Clone)]
pub struct FootprintBarBuilder {
    duration: i64,
    scale: u32,
    volume_precision: u32,
    price_precision: u32,
    bucketer: PriceBucketer,
    /// `None` while empty.
    bar: Option<FootprintBar>,
}

impl FootprintBarBuilder {
    /// Create an empty builder.
    pub fn new(config: &SymbolConfig) -> Self {
        Self {
            duration: config.duration,
            scale: config.scale,
            volume_precision: config.volume_precision,
            price_precision: config.price_precision,
            bucketer: PriceBucketer::from_config(config),
            bar: None,
        }
    }

    /// Whether no trade has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.bar.is_none()
    }

    /// The bar under construction, if any.
    pub fn bar(&self) -> Option<&FootprintBar> {
        self.bar.as_ref()
    }

    /// Seed a bar from its first trade.
    fn open_bar(&self, trade: &Trade) -> FootprintBar {
        let seed = self.bucketer.bucket(trade.price);
        FootprintBar {
            timestamp: floor_to(trade.time, self.duration),
            duration: self.duration,
            scale: self.scale,
            open_time: trade.time,
            close_time: trade.time,
            open: seed,
            high: seed,
            low: seed,
            close: seed,
            volume: 0.0,
            delta: 0.0,
            trades_count: 0,
            volume_precision: self.volume_precision,
            price_precision: self.price_precision,
            price_levels: BTreeMap::new(),
        }
    }

    /// Offer a trade to the bar.
    ///
    /// Returns `false`, leaving the bar untouched, when the trade lies
    /// outside `[timestamp, timestamp + duration)`. An empty builder
    /// accepts any trade.
    pub fn handle_trade(&mut self, trade: &Trade) -> bool {
        if self.bar.is_none() {
            self.bar = Some(self.open_bar(trade));
        }
        let Some(bar) = self.bar.as_mut() else {
            return false;
        };
        if !bar.covers(trade.time) {
            return false;
        }

        // Open/close follow trade time, not arrival order.
        if trade.time > bar.close_time {
            bar.close_time = trade.time;
            bar.close = trade.price;
        }
        if trade.time < bar.open_time {
            bar.open_time = trade.time;
            bar.open = trade.price;
        }
        bar.high = bar.high.max(trade.price);
        bar.low = bar.low.min(trade.price);

        let key = self.bucketer.key(trade.price);
        let size = trade.size();
        bar.price_levels
            .entry(key)
            .or_insert_with(|| PriceLevel::new(key.0))
            .add(trade.side(), size);

        bar.volume += size;
        bar.delta += trade.signed_size();
        bar.trades_count += 1;
        true
    }

    /// Finalize the bar, gap-filling empty price levels between the open
    /// and close buckets.
    ///
    /// Returns `None` if no trade was ever accepted.
    pub fn finalize(self) -> Option<FootprintBar> {
        let mut bar = self.bar?;

        let open_idx = self.bucketer.index(bar.open);
        let close_idx = self.bucketer.index(bar.close);
        for index in open_idx.min(close_idx)..=open_idx.max(close_idx) {
            let price = self.bucketer.price_at(index);
            bar.price_levels
                .entry(OrderedFloat(price))
                .or_insert_with(|| PriceLevel::new(price));
        }

        debug!(
            timestamp = bar.timestamp,
            trades = bar.trades_count,
            levels = bar.price_levels.len(),
            "finalized footprint bar"
        );
        Some(bar)
    }
}

/// Split time-ordered trades into finalized footprint bars.
///
/// Each trade is offered to the current bar; on rejection the bar is
/// finalized and the trade goes to a fresh one.
pub fn build_bars(trades: &[Trade], config: &SymbolConfig) -> Vec<FootprintBar> {
    let mut bars = Vec::new();
    let mut builder = FootprintBarBuilder::new(config);

    for trade in trades {
        if builder.handle_trade(trade) {
            continue;
        }
        let full = std::mem::replace(&mut builder, FootprintBarBuilder::new(config));
        bars.extend(full.finalize());

        if !builder.handle_trade(trade) {
            warn!(id = trade.id, time = trade.time, "trade rejected by a fresh bar");
        }
    }

    bars.extend(builder.finalize());
    bars
}
