//! Run-length consolidation of same-side trades.
//!
//! Buyer-maker and seller-maker trades are tracked in two independent
//! slots, so an opposite-side trade never breaks a run. A run ends when a
//! same-side trade falls into a different pre-aggregation window.

use footprint_core::{floor_to, AggTrade, TimestampMs, Trade};
use tracing::debug;

/// Streaming consolidator over time-ordered trades.
#[derive(Debug, Clone)]
pub struct Consolidator {
    window_ms: i64,
    /// Open run of buyer-maker trades.
    buyer_maker: Option<AggTrade>,
    /// Open run of seller-maker trades.
    seller_maker: Option<AggTrade>,
    emitted: Vec<AggTrade>,
}

impl Consolidator {
    /// Create a consolidator with a pre-aggregation window in milliseconds.
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            buyer_maker: None,
            seller_maker: None,
            emitted: Vec::new(),
        }
    }

    /// Start of the window a trade belongs to (ms).
    #[inline]
    pub fn run_time(&self, trade: &Trade) -> TimestampMs {
        floor_to(trade.time_ms(), self.window_ms)
    }

    /// Add the next trade.
    pub fn push(&mut self, trade: &Trade) {
        let run_time = self.run_time(trade);
        let slot = if trade.is_buyer_maker {
            &mut self.buyer_maker
        } else {
            &mut self.seller_maker
        };

        if let Some(run) = slot.as_mut().filter(|run| run.time == run_time) {
            run.merge(trade);
            return;
        }
        if let Some(done) = slot.replace(AggTrade::seed(trade, run_time)) {
            self.emitted.push(done);
        }
    }

    /// Number of runs closed so far.
    pub fn emitted_len(&self) -> usize {
        self.emitted.len()
    }

    /// Flush open runs and return every run in `(time, id)` order.
    pub fn finish(mut self) -> Vec<AggTrade> {
        self.emitted.extend(self.buyer_maker.take());
        self.emitted.extend(self.seller_maker.take());
        self.emitted.sort_by_key(|agg| (agg.time, agg.id));
        self.emitted
    }
}

/// Consolidate time-ordered trades into runs.
pub fn consolidate(trades: &[Trade], window_ms: i64) -> Vec<AggTrade> {
    let mut consolidator = Consolidator::new(window_ms);
    for trade in trades {
        consolidator.push(trade);
    }
    let runs = consolidator.finish();
    debug!(trades = trades.len(), runs = runs.len(), "consolidated trades");
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn make_trade(id: i64, time: i64, qty: f64, is_buyer_maker: bool) -> Trade {
        Trade {
            id,
            price: 100.0 + id as f64,
            qty,
            quote_qty: (100.0 + id as f64) * qty,
            time,
            is_buyer_maker,
        }
    }

    #[test]
    fn test_window_boundary_splits_run() {
        // 2s windows: 100s and 101s share a window, 102s starts the next.
        let trades = vec![
            make_trade(1, 100, 1.0, false),
            make_trade(2, 101, 1.0, false),
            make_trade(3, 102, 1.0, false),
        ];
        let runs = consolidate(&trades, 2000);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, 1);
        assert_eq!(runs[0].count, 2);
        assert_eq!(runs[0].time, 100_000);
        assert_relative_eq!(runs[0].qty, 2.0);
        assert_eq!(runs[1].id, 3);
        assert_eq!(runs[1].count, 1);
        assert_eq!(runs[1].time, 102_000);
    }

    #[test]
    fn test_opposite_side_does_not_interrupt_run() {
        let trades = vec![
            make_trade(1, 100, 1.0, false),
            make_trade(2, 100, 5.0, true),
            make_trade(3, 100, 2.0, false),
        ];
        let runs = consolidate(&trades, 1000);

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, 1);
        assert_eq!(runs[0].count, 2);
        assert!(!runs[0].is_buyer_maker);
        assert_relative_eq!(runs[0].qty, 3.0);
        assert_relative_eq!(runs[0].quote_qty, 101.0 + 206.0);
        assert_eq!(runs[1].id, 2);
        assert!(runs[1].is_buyer_maker);
    }

    #[test]
    fn test_seed_fields_kept() {
        let trades = vec![make_trade(10, 50, 1.0, true), make_trade(11, 50, 1.0, true)];
        let runs = consolidate(&trades, 100);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, 10);
        assert_relative_eq!(runs[0].price, 110.0);
        assert_eq!(runs[0].time, 50_000);
    }

    #[test]
    fn test_output_sorted_despite_flush_order() {
        let trades = vec![
            make_trade(1, 100, 1.0, true),
            make_trade(2, 100, 1.0, false),
            make_trade(3, 105, 1.0, false),
        ];
        let mut consolidator = Consolidator::new(1000);
        for trade in &trades {
            consolidator.push(trade);
        }
        // The seller-maker run at 100s closed first.
        assert_eq!(consolidator.emitted_len(), 1);

        let runs = consolidator.finish();
        let keys: Vec<(i64, i64)> = runs.iter().map(|r| (r.time, r.id)).collect();
        assert_eq!(keys, vec![(100_000, 1), (100_000, 2), (105_000, 3)]);
    }

    #[test]
    fn test_side_totals_preserved() {
        let trades: Vec<Trade> = (0..500)
            .map(|i| make_trade(i, 1_000 + i / 3, 0.001 * (i % 11 + 1) as f64, i % 4 == 0))
            .collect();
        let runs = consolidate(&trades, 2000);

        for side in [true, false] {
            let input_qty: f64 = trades.iter().filter(|t| t.is_buyer_maker == side).map(|t| t.qty).sum();
            let input_count = trades.iter().filter(|t| t.is_buyer_maker == side).count() as u32;
            let run_qty: f64 = runs.iter().filter(|r| r.is_buyer_maker == side).map(|r| r.qty).sum();
            let run_count: u32 = runs.iter().filter(|r| r.is_buyer_maker == side).map(|r| r.count).sum();
            assert_relative_eq!(input_qty, run_qty, epsilon = 1e-9);
            assert_eq!(input_count, run_count);
        }

        assert!(runs.windows(2).all(|w| (w[0].time, w[0].id) <= (w[1].time, w[1].id)));
        let ids: HashSet<i64> = runs.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), runs.len());
    }

    #[test]
    fn test_empty_input() {
        assert!(consolidate(&[], 100).is_empty());
    }
}
