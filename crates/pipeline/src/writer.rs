//! Output writers for footprint bars and consolidated trades.
//!
//! Every numeric field is rounded on the way out: prices, bid and ask sizes
//! at `price_precision`, volumes and deltas at `volume_precision`. Files are
//! written to a `.partial` sibling and renamed into place, so an interrupted
//! run never leaves an output that a later run would mistake for finished.

use footprint_core::{round_to, AggTrade, Error, FootprintBar, PriceLevel, Result, SymbolConfig};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Header of the consolidated trade CSV.
pub const AGG_TRADE_HEADER: [&str; 7] = [
    "id",
    "price",
    "qty",
    "quote_qty",
    "time",
    "is_buyer_maker",
    "count",
];

/// Writes a file's footprint bars in one output format.
pub trait BarWriter: Send + Sync {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &'static str;

    /// Write all bars of one input file to `path`.
    fn write(&self, path: &Path, bars: &[FootprintBar]) -> Result<()>;
}

/// Registry of footprint output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// Instantiate the writer.
    pub fn build(self) -> Box<dyn BarWriter> {
        match self {
            OutputFormat::Json => Box::new(JsonBarWriter),
            OutputFormat::Csv => Box::new(CsvBarWriter),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(Error::config(format!("Unsupported output format: {}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run `body` against a buffered writer for `path`, publishing the file only
/// if it succeeds.
fn write_atomically<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut partial = PathBuf::from(path);
    partial.as_mut_os_string().push(".partial");

    let result: Result<()> = (|| {
        let mut out = BufWriter::with_capacity(8 * 1024 * 1024, File::create(&partial)?);
        body(&mut out)?;
        out.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&partial, path)?;
            Ok(())
        }
        Err(e) => {
            // Best-effort cleanup.
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

/// Format a value with a fixed number of decimals.
#[inline]
fn fixed(value: f64, precision: u32) -> String {
    format!("{:.*}", precision as usize, round_to(value, precision))
}

/// Price-level map key: the canonical price with at least six decimals,
/// more when the price precision is finer.
#[inline]
fn level_key(price: f64, price_precision: u32) -> String {
    let decimals = price_precision.max(6) as usize;
    format!("{:.*}", decimals, round_to(price, price_precision))
}

/// JSON document: bars keyed by timestamp, in bar order.
struct FootprintDocument<'a>(&'a [FootprintBar]);

impl Serialize for FootprintDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for bar in self.0 {
            map.serialize_entry(&bar.timestamp.to_string(), &BarView(bar))?;
        }
        map.end()
    }
}

struct BarView<'a>(&'a FootprintBar);

impl Serialize for BarView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let bar = self.0;
        let pp = bar.price_precision;
        let vp = bar.volume_precision;

        let mut s = serializer.serialize_struct("FootprintBar", 15)?;
        s.serialize_field("timestamp", &bar.timestamp)?;
        s.serialize_field("duration", &bar.duration)?;
        s.serialize_field("scale", &bar.scale)?;
        s.serialize_field("openTime", &bar.open_time)?;
        s.serialize_field("closeTime", &bar.close_time)?;
        s.serialize_field("open", &round_to(bar.open, pp))?;
        s.serialize_field("high", &round_to(bar.high, pp))?;
        s.serialize_field("low", &round_to(bar.low, pp))?;
        s.serialize_field("close", &round_to(bar.close, pp))?;
        s.serialize_field("volume", &round_to(bar.volume, vp))?;
        s.serialize_field("delta", &round_to(bar.delta, vp))?;
        s.serialize_field("tradesCount", &bar.trades_count)?;
        s.serialize_field("volumePrecision", &vp)?;
        s.serialize_field("pricePrecision", &pp)?;
        s.serialize_field("priceLevels", &LevelsView(bar))?;
        s.end()
    }
}

struct LevelsView<'a>(&'a FootprintBar);

impl Serialize for LevelsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let bar = self.0;
        let mut map = serializer.serialize_map(Some(bar.price_levels.len()))?;
        for (price, level) in &bar.price_levels {
            map.serialize_entry(
                &level_key(price.0, bar.price_precision),
                &LevelView {
                    level,
                    price_precision: bar.price_precision,
                    volume_precision: bar.volume_precision,
                },
            )?;
        }
        map.end()
    }
}

struct LevelView<'a> {
    level: &'a PriceLevel,
    price_precision: u32,
    volume_precision: u32,
}

impl Serialize for LevelView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let l = self.level;
        let pp = self.price_precision;
        let vp = self.volume_precision;

        let mut s = serializer.serialize_struct("PriceLevel", 8)?;
        s.serialize_field("price", &round_to(l.price, pp))?;
        s.serialize_field("volume", &round_to(l.volume, vp))?;
        s.serialize_field("bidSize", &round_to(l.bid_size, pp))?;
        s.serialize_field("askSize", &round_to(l.ask_size, pp))?;
        s.serialize_field("bidCount", &l.bid_count)?;
        s.serialize_field("askCount", &l.ask_count)?;
        s.serialize_field("delta", &round_to(l.delta, vp))?;
        s.serialize_field("tradesCount", &l.trades_count)?;
        s.end()
    }
}

/// Pretty-printed JSON object keyed by bar timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBarWriter;

impl JsonBarWriter {
    /// Serialize bars into any writer.
    pub fn to_writer<W: Write>(writer: W, bars: &[FootprintBar]) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        FootprintDocument(bars).serialize(&mut ser)?;
        Ok(())
    }
}

impl BarWriter for JsonBarWriter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, path: &Path, bars: &[FootprintBar]) -> Result<()> {
        write_atomically(path, |out| Self::to_writer(out, bars))
    }
}

/// Flat CSV with one row per (bar, price level).
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvBarWriter;

impl CsvBarWriter {
    const HEADER: [&'static str; 20] = [
        "timestamp",
        "duration",
        "scale",
        "open_time",
        "close_time",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "delta",
        "trades_count",
        "level_price",
        "level_volume",
        "bid_size",
        "ask_size",
        "bid_count",
        "ask_count",
        "level_delta",
        "level_trades_count",
    ];

    /// Serialize bars into any writer.
    pub fn to_writer<W: Write>(writer: W, bars: &[FootprintBar]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(Self::HEADER)?;
        for bar in bars {
            let pp = bar.price_precision;
            let vp = bar.volume_precision;
            for level in bar.price_levels.values() {
                csv.write_record([
                    bar.timestamp.to_string(),
                    bar.duration.to_string(),
                    bar.scale.to_string(),
                    bar.open_time.to_string(),
                    bar.close_time.to_string(),
                    fixed(bar.open, pp),
                    fixed(bar.high, pp),
                    fixed(bar.low, pp),
                    fixed(bar.close, pp),
                    fixed(bar.volume, vp),
                    fixed(bar.delta, vp),
                    bar.trades_count.to_string(),
                    fixed(level.price, pp),
                    fixed(level.volume, vp),
                    fixed(level.bid_size, pp),
                    fixed(level.ask_size, pp),
                    level.bid_count.to_string(),
                    level.ask_count.to_string(),
                    fixed(level.delta, vp),
                    level.trades_count.to_string(),
                ])?;
            }
        }
        csv.flush()?;
        Ok(())
    }
}

impl BarWriter for CsvBarWriter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, path: &Path, bars: &[FootprintBar]) -> Result<()> {
        write_atomically(path, |out| Self::to_writer(out, bars))
    }
}

/// Serialize consolidated trades as CSV into any writer.
pub fn agg_trades_to_writer<W: Write>(
    writer: W,
    trades: &[AggTrade],
    config: &SymbolConfig,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(AGG_TRADE_HEADER)?;
    for t in trades {
        csv.write_record([
            t.id.to_string(),
            fixed(t.price, config.price_precision),
            fixed(t.qty, config.volume_precision),
            fixed(t.quote_qty, config.volume_precision),
            t.time.to_string(),
            if t.is_buyer_maker { "1" } else { "0" }.to_string(),
            t.count.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write consolidated trades to `path`.
pub fn write_agg_trades(path: &Path, trades: &[AggTrade], config: &SymbolConfig) -> Result<()> {
    write_atomically(path, |out| agg_trades_to_writer(out, trades, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_core::PriceLevel;
    use ordered_float::OrderedFloat;
    use std::collections::BTreeMap;

    fn make_bar() -> FootprintBar {
        let mut price_levels = BTreeMap::new();
        let mut high = PriceLevel::new(100010.0);
        high.add(footprint_core::TradeSide::Buy, 0.123456);
        let mut low = PriceLevel::new(99990.0);
        low.add(footprint_core::TradeSide::Sell, 1.0);
        price_levels.insert(OrderedFloat(100010.0), high);
        price_levels.insert(OrderedFloat(100000.0), PriceLevel::new(100000.0));
        price_levels.insert(OrderedFloat(99990.0), low);

        FootprintBar {
            timestamp: 1_704_067_200,
            duration: 300,
            scale: 100,
            open_time: 1_704_067_201,
            close_time: 1_704_067_450,
            open: 99995.123,
            high: 100012.0,
            low: 99990.0,
            close: 100011.456,
            volume: 1.123456,
            delta: -0.876544,
            trades_count: 2,
            volume_precision: 2,
            price_precision: 1,
            price_levels,
        }
    }

    #[test]
    fn test_output_format_registry() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!(matches!("parquet".parse::<OutputFormat>(), Err(Error::Config(_))));
        assert_eq!(OutputFormat::Json.build().extension(), "json");
        assert_eq!(OutputFormat::Csv.build().extension(), "csv");
    }

    #[test]
    fn test_json_rounding_and_level_order() {
        let mut buf = Vec::new();
        JsonBarWriter::to_writer(&mut buf, &[make_bar()]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        // Levels appear in ascending numeric price, not string order.
        let low = text.find("\"99990.000000\"").unwrap();
        let mid = text.find("\"100000.000000\"").unwrap();
        let high = text.find("\"100010.000000\"").unwrap();
        assert!(low < mid && mid < high);

        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        let bar = &doc["1704067200"];
        assert_eq!(bar["open"], 99995.1);
        assert_eq!(bar["close"], 100011.5);
        assert_eq!(bar["volume"], 1.12);
        assert_eq!(bar["delta"], -0.88);
        assert_eq!(bar["openTime"], 1_704_067_201);
        assert_eq!(bar["pricePrecision"], 1);

        let level = &bar["priceLevels"]["100010.000000"];
        assert_eq!(level["askSize"], 0.1);
        assert_eq!(level["volume"], 0.12);
        assert_eq!(level["askCount"], 1);
        assert_eq!(bar["priceLevels"]["100000.000000"]["tradesCount"], 0);
    }

    #[test]
    fn test_fine_precision_level_keys_stay_distinct() {
        let mut bar = make_bar();
        bar.price_precision = 8;
        bar.price_levels.clear();
        for price in [0.00001231, 0.00001234] {
            let mut level = PriceLevel::new(price);
            level.add(footprint_core::TradeSide::Buy, 1.0);
            bar.price_levels.insert(OrderedFloat(price), level);
        }

        let mut buf = Vec::new();
        JsonBarWriter::to_writer(&mut buf, &[bar]).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let levels = doc["1704067200"]["priceLevels"].as_object().unwrap();
        assert_eq!(levels.len(), 2);
        assert!(levels.contains_key("0.00001231"));
        assert!(levels.contains_key("0.00001234"));
    }

    #[test]
    fn test_level_key_width() {
        assert_eq!(level_key(42000.0, 1), "42000.000000");
        assert_eq!(level_key(0.00001231, 8), "0.00001231");
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let mut buf = Vec::new();
        JsonBarWriter::to_writer(&mut buf, &[make_bar()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("{\n    \"1704067200\": {\n        \"timestamp\""));
    }

    #[test]
    fn test_empty_json_document() {
        let mut buf = Vec::new();
        JsonBarWriter::to_writer(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{}");
    }

    #[test]
    fn test_csv_bar_rows() {
        let mut buf = Vec::new();
        CsvBarWriter::to_writer(&mut buf, &[make_bar()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("timestamp,duration,scale"));
        assert!(lines[1].contains(",99990.0,"));
        assert!(lines[3].starts_with("1704067200,300,100,1704067201,1704067450,99995.1,"));
    }

    #[test]
    fn test_agg_trade_csv() {
        let trades = vec![AggTrade {
            id: 42,
            price: 42150.56,
            qty: 0.0151,
            quote_qty: 636.47,
            time: 1_704_067_200_000,
            is_buyer_maker: true,
            count: 3,
        }];
        let mut buf = Vec::new();
        agg_trades_to_writer(&mut buf, &trades, &SymbolConfig::default()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "id,price,qty,quote_qty,time,is_buyer_maker,count\n\
             42,42150.6,0.02,636.47,1704067200000,1,3\n"
        );
    }

    #[test]
    fn test_atomic_write_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        JsonBarWriter.write(&path, &[make_bar()]).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("out.json.partial").exists());
    }

    #[test]
    fn test_failed_write_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let err = write_atomically(&path, |_| Err(Error::data("boom"))).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
        assert!(!path.exists());
        assert!(!dir.path().join("out.csv.partial").exists());
    }
}
