//! Trade aggregation for the footprint system.
//!
//! This crate handles:
//! - Price bucketing onto canonical price levels
//! - Footprint bar building and gap-fill
//! - Same-side trade consolidation

pub mod bucket;
pub mod consolidator;
pub mod footprint;

pub use bucket::PriceBucketer;
pub use consolidator::{consolidate, Consolidator};
pub use footprint::{build_bars, FootprintBarBuilder};
