//! Price bucketing.
//!
//! Maps raw prices onto canonical price-level keys. A bucket is
//! `scale * 10^-price_precision` wide and a price always belongs to the
//! bucket at or below it.

use footprint_core::{round_to, Price, SymbolConfig};
use ordered_float::OrderedFloat;

/// Absolute slack applied before flooring `price / height`.
///
/// Canonical bucket prices are rounded decimals, so dividing one by the
/// height can land a hair under its own index.
const MIN_TOLERANCE: f64 = 1e-9;

/// Deterministic price -> bucket mapping for one symbol configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBucketer {
    height: f64,
    price_precision: u32,
}

impl PriceBucketer {
    /// Create a bucketer for `scale * 10^-price_precision` wide buckets.
    pub fn new(scale: u32, price_precision: u32) -> Self {
        Self {
            height: scale as f64 * 10f64.powi(-(price_precision as i32)),
            price_precision,
        }
    }

    /// Create a bucketer from a symbol configuration.
    pub fn from_config(config: &SymbolConfig) -> Self {
        Self::new(config.scale, config.price_precision)
    }

    /// Bucket height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Integer index of the bucket containing `price`.
    #[inline]
    pub fn index(&self, price: f64) -> i64 {
        let ratio = price / self.height;
        let tolerance = (ratio.abs() * 16.0 * f64::EPSILON).max(MIN_TOLERANCE);
        (ratio + tolerance).floor() as i64
    }

    /// Canonical price of the bucket with the given index.
    #[inline]
    pub fn price_at(&self, index: i64) -> f64 {
        round_to(index as f64 * self.height, self.price_precision)
    }

    /// Canonical bucket price for `price`.
    #[inline]
    pub fn bucket(&self, price: f64) -> f64 {
        self.price_at(self.index(price))
    }

    /// Map key for `price`.
    #[inline]
    pub fn key(&self, price: f64) -> Price {
        OrderedFloat(self.bucket(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_not_round() {
        let b = PriceBucketer::new(100, 1);
        assert_eq!(b.bucket(50009.9), 50000.0);
        assert_eq!(b.bucket(50010.0), 50010.0);
        assert_eq!(b.bucket(50000.0), 50000.0);
    }

    #[test]
    fn test_decoded_prices_stay_in_their_bucket() {
        // Decoded prices carry a small positive epsilon.
        let b = PriceBucketer::new(1, 1);
        assert_eq!(b.bucket(0.3 + 1e-9), 0.3);
        assert_eq!(b.bucket(42150.5 + 1e-9), 42150.5);
    }

    #[test]
    fn test_fine_buckets() {
        let b = PriceBucketer::new(5, 2);
        assert_eq!(b.bucket(1.23), 1.2);
        assert_eq!(b.bucket(1.27), 1.25);
        assert_eq!(b.bucket(0.15), 0.15);
    }

    #[test]
    fn test_negative_prices_floor_downwards() {
        let b = PriceBucketer::new(10, 0);
        assert_eq!(b.bucket(-1.0), -10.0);
        assert_eq!(b.index(-1.0), -1);
    }

    #[test]
    fn test_bucket_is_idempotent() {
        for (scale, precision) in [(100, 1), (1, 1), (5, 2), (25, 3), (1, 8)] {
            let b = PriceBucketer::new(scale, precision);
            for i in 0..5_000 {
                let price = 0.37 + i as f64 * 13.0071;
                let once = b.bucket(price);
                assert_eq!(b.bucket(once), once, "scale {} precision {} price {}", scale, precision, price);
                assert!(once <= price + 1e-9);
            }
        }
    }

    #[test]
    fn test_index_round_trip() {
        let b = PriceBucketer::new(100, 1);
        for index in 4_000..6_000 {
            assert_eq!(b.index(b.price_at(index)), index);
        }
    }

    #[test]
    fn test_from_config() {
        let b = PriceBucketer::from_config(&SymbolConfig::default());
        assert!((b.height() - 10.0).abs() < 1e-12);
    }
}
