//! Record parsers turning raw trade lines into [`Trade`]s.
//!
//! Parsers are pluggable per data source through [`RecordParser`];
//! [`ParserKind`] is the registry of the ones shipped here.
//! [`TradeDecoder`] adapts any parser to the [`StreamDecoder`] framing used
//! by [`crate::reader::StreamReader`].

use crate::decoder::{decode_f64, decode_i64, digit_count};
use crate::reader::{Decoded, StreamDecoder};
use footprint_core::{Error, Result, Trade};
use std::fmt;
use std::str::FromStr;

/// Parses one line of a specific trade file format.
pub trait RecordParser: Send + Sync {
    /// Parse the record starting at `cursor`.
    ///
    /// Returns the trade and the cursor just past the record, or `None` when
    /// the record cannot be advanced past (malformed input).
    fn parse_line(&self, bytes: &[u8], cursor: usize) -> Option<(Trade, usize)>;

    /// Whether a line is a column header rather than data.
    fn is_header(&self, line: &[u8]) -> bool;
}

/// Registry of supported record parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Binance spot/futures trade dumps.
    Binance,
}

impl ParserKind {
    /// Instantiate the parser.
    pub fn build(self) -> Box<dyn RecordParser> {
        match self {
            ParserKind::Binance => Box::new(BinanceParser),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParserKind::Binance => "binance",
        }
    }
}

impl FromStr for ParserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(ParserKind::Binance),
            other => Err(Error::config(format!("Unsupported exchange: {}", other))),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binance trade CSV: `id,price,qty,quote_qty,time,is_buyer_maker[,...]`.
///
/// `time` is in milliseconds and is truncated to seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceParser;

impl BinanceParser {
    /// Require a comma at `pos` and a digit somewhere in `start..pos`.
    fn field_end(bytes: &[u8], start: usize, pos: usize) -> Option<usize> {
        if digit_count(bytes, start, pos) == 0 || bytes.get(pos) != Some(&b',') {
            return None;
        }
        Some(pos + 1)
    }
}

impl RecordParser for BinanceParser {
    fn parse_line(&self, bytes: &[u8], cursor: usize) -> Option<(Trade, usize)> {
        let (id, p) = decode_i64(bytes, cursor);
        let p = Self::field_end(bytes, cursor, p)?;

        let (price, end) = decode_f64(bytes, p);
        let p = Self::field_end(bytes, p, end)?;

        let (qty, end) = decode_f64(bytes, p);
        let p = Self::field_end(bytes, p, end)?;

        let (quote_qty, end) = decode_f64(bytes, p);
        let p = Self::field_end(bytes, p, end)?;

        let (time_ms, end) = decode_i64(bytes, p);
        let p = Self::field_end(bytes, p, end)?;

        let is_buyer_maker = matches!(bytes.get(p), Some(b't' | b'T' | b'1'));

        // Skip the remaining fields and the line terminator.
        let mut p = p;
        while p < bytes.len() && bytes[p] != b'\n' {
            p += 1;
        }
        if p < bytes.len() {
            p += 1;
        }

        let trade = Trade {
            id,
            price,
            qty,
            quote_qty,
            time: time_ms.div_euclid(1000),
            is_buyer_maker,
        };
        Some((trade, p))
    }

    fn is_header(&self, line: &[u8]) -> bool {
        line.windows(8).any(|w| w == b"id,price")
    }
}

/// Frames newline-terminated records for a [`RecordParser`].
///
/// Only the first line of the input is checked against the parser's header
/// rule; blank lines are skipped.
pub struct TradeDecoder<'a> {
    parser: &'a dyn RecordParser,
    first_line: bool,
}

impl<'a> TradeDecoder<'a> {
    pub fn new(parser: &'a dyn RecordParser) -> Self {
        Self {
            parser,
            first_line: true,
        }
    }
}

impl StreamDecoder for TradeDecoder<'_> {
    type Item = Trade;

    fn decode(&mut self, buf: &[u8], eof: bool, offset: u64) -> Result<Decoded<Trade>> {
        let line_len = match buf.iter().position(|&b| b == b'\n') {
            Some(i) => i + 1,
            None if eof => buf.len(),
            None => return Ok(Decoded::NeedMore),
        };
        let line = &buf[..line_len];

        if std::mem::take(&mut self.first_line) && self.parser.is_header(line) {
            return Ok(Decoded::Skip { consumed: line_len });
        }
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Decoded::Skip { consumed: line_len });
        }

        match self.parser.parse_line(line, 0) {
            Some((trade, next)) if next > 0 && next <= line_len => Ok(Decoded::Record {
                value: trade,
                consumed: line_len,
            }),
            _ => Err(Error::malformed(
                offset,
                format!(
                    "cannot parse trade record {:?}",
                    String::from_utf8_lossy(line).trim_end()
                ),
            )),
        }
    }
}
