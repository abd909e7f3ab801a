//! Core data types for the footprint system.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Timestamp in whole seconds since Unix epoch (UTC).
pub type TimestampSec = i64;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Price type with ordering support, used as the price-level map key.
pub type Price = OrderedFloat<f64>;

/// Size/quantity type.
pub type Size = f64;

/// Floor a timestamp to the start of its `width`-wide bucket.
#[inline]
pub fn floor_to(ts: i64, width: i64) -> i64 {
    ts.div_euclid(width) * width
}

/// `10^precision` as f64.
#[inline]
pub fn pow10(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

/// Round to `precision` decimal places, half away from zero.
#[inline]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = pow10(precision);
    (value * factor).round() / factor
}

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum TradeSide {
    /// Taker bought (seller was the resting order).
    Buy = 1,
    /// Taker sold (buyer was the resting order).
    Sell = -1,
}

impl TradeSide {
    /// Get the sign as f64.
    #[inline]
    pub fn sign_f64(self) -> f64 {
        self as i8 as f64
    }
}

/// A single executed trade (print) from the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Exchange-assigned trade id.
    pub id: i64,
    /// Trade price.
    pub price: f64,
    /// Trade quantity, always positive.
    pub qty: Size,
    /// price * qty as reported by the exchange.
    pub quote_qty: f64,
    /// Event time truncated to seconds.
    pub time: TimestampSec,
    /// Whether the buyer was the maker (i.e. the aggressor sold).
    pub is_buyer_maker: bool,
}

impl Trade {
    /// Aggressive buy (not buyer-maker).
    #[inline]
    pub fn is_buy(&self) -> bool {
        !self.is_buyer_maker
    }

    /// Aggressor side.
    #[inline]
    pub fn side(&self) -> TradeSide {
        if self.is_buy() {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        }
    }

    /// Size traded. Same as `qty`.
    #[inline]
    pub fn size(&self) -> Size {
        self.qty
    }

    /// Size signed by aggressor side (positive for buys).
    #[inline]
    pub fn signed_size(&self) -> f64 {
        self.qty * self.side().sign_f64()
    }

    /// Event time in milliseconds, derived from the second-resolution time.
    #[inline]
    pub fn time_ms(&self) -> TimestampMs {
        self.time * 1000
    }

    /// Event time as a UTC datetime.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// Key of the canonical trade order: time, then id.
    #[inline]
    pub fn order_key(&self) -> (TimestampSec, i64) {
        (self.time, self.id)
    }
}

/// Sort trades into canonical `(time, id)` order.
pub fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_key(Trade::order_key);
}

/// A run of consecutive same-side trades merged into one record.
#[derive(Debug, Clone, PartialEq)]
pub struct AggTrade {
    /// Id of the first trade in the run.
    pub id: i64,
    /// Price of the first trade in the run.
    pub price: f64,
    /// Summed quantity.
    pub qty: Size,
    /// Summed quote quantity.
    pub quote_qty: f64,
    /// Start of the run's pre-aggregation window (ms).
    pub time: TimestampMs,
    /// Side of every trade in the run.
    pub is_buyer_maker: bool,
    /// Number of merged trades.
    pub count: u32,
}

impl AggTrade {
    /// Open a run from its first trade.
    pub fn seed(trade: &Trade, run_time: TimestampMs) -> Self {
        Self {
            id: trade.id,
            price: trade.price,
            qty: trade.qty,
            quote_qty: trade.quote_qty,
            time: run_time,
            is_buyer_maker: trade.is_buyer_maker,
            count: 1,
        }
    }

    /// Merge another trade of the same run.
    pub fn merge(&mut self, trade: &Trade) {
        self.qty += trade.qty;
        self.quote_qty += trade.quote_qty;
        self.count += 1;
    }
}

/// Per-bucket statistics inside one footprint bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceLevel {
    /// Canonical bucket price.
    pub price: f64,
    /// Total traded size.
    pub volume: Size,
    /// Size sold aggressively into the bid.
    pub bid_size: Size,
    /// Size bought aggressively from the ask.
    pub ask_size: Size,
    /// Number of sell-aggressor trades.
    pub bid_count: u32,
    /// Number of buy-aggressor trades.
    pub ask_count: u32,
    /// ask_size - bid_size.
    pub delta: f64,
    /// Number of trades.
    pub trades_count: u32,
}

impl PriceLevel {
    /// Create an empty level at a canonical price.
    pub fn new(price: f64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    /// Record one trade of the given side and size.
    pub fn add(&mut self, side: TradeSide, size: Size) {
        match side {
            TradeSide::Buy => {
                self.ask_size += size;
                self.ask_count += 1;
            }
            TradeSide::Sell => {
                self.bid_size += size;
                self.bid_count += 1;
            }
        }
        self.delta += size * side.sign_f64();
        self.volume += size;
        self.trades_count += 1;
    }

    /// Whether no trade was ever recorded here (gap-filled level).
    pub fn is_empty(&self) -> bool {
        self.trades_count == 0
    }
}

/// One fixed-duration footprint bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintBar {
    /// Bucket start (seconds).
    pub timestamp: TimestampSec,
    /// Bar duration (seconds).
    pub duration: i64,
    /// Price-bucket width multiplier.
    pub scale: u32,
    /// Time of the earliest trade.
    pub open_time: TimestampSec,
    /// Time of the latest trade.
    pub close_time: TimestampSec,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Total traded size.
    pub volume: Size,
    /// Net aggressor volume.
    pub delta: f64,
    /// Number of trades.
    pub trades_count: u32,
    /// Decimal places used for volumes when serialized.
    pub volume_precision: u32,
    /// Decimal places used for prices when serialized.
    pub price_precision: u32,
    /// Levels keyed by canonical bucket price, ascending.
    pub price_levels: BTreeMap<Price, PriceLevel>,
}

impl FootprintBar {
    /// Exclusive end of the bar window.
    #[inline]
    pub fn end(&self) -> TimestampSec {
        self.timestamp + self.duration
    }

    /// Whether a trade time falls inside `[timestamp, timestamp + duration)`.
    #[inline]
    pub fn covers(&self, time: TimestampSec) -> bool {
        time >= self.timestamp && time < self.end()
    }

    /// Sum of volume over all price levels.
    pub fn level_volume(&self) -> Size {
        self.price_levels.values().map(|l| l.volume).sum()
    }

    /// Sum of delta over all price levels.
    pub fn level_delta(&self) -> f64 {
        self.price_levels.values().map(|l| l.delta).sum()
    }
}
