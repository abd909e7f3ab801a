//! Data ingestion for the footprint system.
//!
//! This crate handles:
//! - Allocation-free numeric field decoding
//! - Chunked streaming reads with partial-record carry-over
//! - Pluggable record parsers (Binance trade dumps)

pub mod decoder;
pub mod parser;
pub mod reader;

pub use decoder::{decode_f64, decode_i64, DECIMAL_EPSILON};
pub use parser::{BinanceParser, ParserKind, RecordParser, TradeDecoder};
pub use reader::{Decoded, StreamDecoder, StreamReader};

use footprint_core::{Result, Trade};
use std::io::Read;

/// Read every trade from `source` in file order.
pub fn read_trades<R: Read>(source: R, parser: &dyn RecordParser) -> Result<Vec<Trade>> {
    let mut reader = StreamReader::new(source);
    let mut decoder = TradeDecoder::new(parser);
    let mut trades = Vec::new();
    while let Some(trade) = reader.next_record(&mut decoder)? {
        trades.push(trade);
    }
    tracing::trace!(count = trades.len(), "decoded trades");
    Ok(trades)
}
