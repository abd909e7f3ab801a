//! File-level orchestration for the footprint system.
//!
//! This crate handles:
//! - Per-file processing with skip-if-done semantics
//! - JSON and CSV output writers
//! - Bounded parallel batch runs over an input directory

pub mod batch;
pub mod processor;
pub mod stats;
pub mod writer;

pub use batch::{discover_inputs, run, run_batch, BatchReport};
pub use processor::{FileOutcome, Processor, AGG_TRADE_DIR, FOOTPRINT_DIR};
pub use stats::ProcessingStats;
pub use writer::{
    agg_trades_to_writer, write_agg_trades, BarWriter, CsvBarWriter, JsonBarWriter, OutputFormat,
    AGG_TRADE_HEADER,
};
