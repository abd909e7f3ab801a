//! Per-file processing statistics.

use chrono::{DateTime, Utc};
use footprint_core::Trade;
use std::time::Duration;
use tracing::info;

/// What one input file produced and how long it took.
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    /// Trades parsed from the file.
    pub total_trades: usize,
    /// Footprint bars produced (0 if that stage was skipped).
    pub bars: usize,
    /// Consolidated trades produced (0 if that stage was skipped).
    pub aggregated_trades: usize,
    /// Reading, parsing and sorting.
    pub parse_time: Duration,
    /// Aggregation and writing.
    pub write_time: Duration,
    /// Time of the earliest trade.
    pub first_trade: Option<DateTime<Utc>>,
    /// Time of the latest trade.
    pub last_trade: Option<DateTime<Utc>>,
}

impl ProcessingStats {
    /// Record the time span of sorted trades.
    pub fn record_span(&mut self, sorted: &[Trade]) {
        self.first_trade = sorted.first().and_then(Trade::datetime);
        self.last_trade = sorted.last().and_then(Trade::datetime);
    }

    /// Total wall time.
    pub fn total_time(&self) -> Duration {
        self.parse_time + self.write_time
    }

    /// Emit the completion event for `file`.
    pub fn log(&self, file: &str) {
        info!(
            file,
            trades = self.total_trades,
            bars = self.bars,
            aggregated_trades = self.aggregated_trades,
            parse_ms = self.parse_time.as_millis() as u64,
            write_ms = self.write_time.as_millis() as u64,
            total_ms = self.total_time().as_millis() as u64,
            first_trade = ?self.first_trade,
            last_trade = ?self.last_trade,
            "completed processing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(time: i64) -> Trade {
        Trade {
            id: time,
            price: 1.0,
            qty: 1.0,
            quote_qty: 1.0,
            time,
            is_buyer_maker: false,
        }
    }

    #[test]
    fn test_record_span() {
        let mut stats = ProcessingStats::default();
        stats.record_span(&[make_trade(1_704_067_200), make_trade(1_704_153_599)]);
        assert_eq!(stats.first_trade.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(stats.last_trade.unwrap().to_rfc3339(), "2024-01-01T23:59:59+00:00");
    }

    #[test]
    fn test_empty_span() {
        let mut stats = ProcessingStats::default();
        stats.record_span(&[]);
        assert!(stats.first_trade.is_none());
        assert!(stats.last_trade.is_none());
    }

    #[test]
    fn test_total_time() {
        let stats = ProcessingStats {
            parse_time: Duration::from_millis(120),
            write_time: Duration::from_millis(30),
            ..ProcessingStats::default()
        };
        assert_eq!(stats.total_time(), Duration::from_millis(150));
    }
}
