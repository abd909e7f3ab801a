//! Per-file pipeline: read, sort, build bars, consolidate, write.
//!
//! A [`Processor`] holds only immutable configuration, so one instance can
//! serve any number of files concurrently; every file's trades and bars
//! live on the stack of its own `process_file` call.

use crate::stats::ProcessingStats;
use crate::writer::{write_agg_trades, BarWriter, OutputFormat};
use footprint_aggregation::{build_bars, consolidate};
use footprint_core::{sort_trades, Config, Error, Result, SymbolConfig, Trade};
use footprint_ingestion::{read_trades, ParserKind, RecordParser};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Subdirectory of the output root holding footprint documents.
pub const FOOTPRINT_DIR: &str = "footprint";
/// Subdirectory of the output root holding consolidated trades.
pub const AGG_TRADE_DIR: &str = "aggtrade";

/// Result of processing one input file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// At least one stage ran.
    Processed(ProcessingStats),
    /// Both outputs already existed.
    Skipped,
}

/// Converts trade files into footprint bars and consolidated trades.
pub struct Processor {
    parser: Box<dyn RecordParser>,
    bar_writer: Box<dyn BarWriter>,
    symbol: SymbolConfig,
    output_dir: PathBuf,
}

impl Processor {
    /// Create a processor from explicit collaborators.
    ///
    /// Fails with [`Error::Config`] if `symbol` would make bar or run
    /// windows empty.
    pub fn new(
        parser: Box<dyn RecordParser>,
        bar_writer: Box<dyn BarWriter>,
        symbol: SymbolConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        symbol.validate()?;
        Ok(Self {
            parser,
            bar_writer,
            symbol,
            output_dir: output_dir.into(),
        })
    }

    /// Validate configuration and resolve the named parser and writer.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let parser: ParserKind = config.process.parser.parse()?;
        let format: OutputFormat = config.process.output_format.parse()?;
        Self::new(
            parser.build(),
            format.build(),
            config.symbol.clone(),
            config.process.output_dir.clone(),
        )
    }

    /// Where the footprint document for `input` goes.
    pub fn footprint_path(&self, input: &Path) -> Result<PathBuf> {
        let name = file_name(input)?;
        let mut path = self.output_dir.join(FOOTPRINT_DIR).join(name);
        path.set_extension(self.bar_writer.extension());
        Ok(path)
    }

    /// Where the consolidated trades for `input` go.
    pub fn agg_trade_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(self.output_dir.join(AGG_TRADE_DIR).join(file_name(input)?))
    }

    /// Read all trades of a file and sort them by `(time, id)`.
    pub fn parse_file(&self, input: &Path) -> Result<Vec<Trade>> {
        let file = File::open(input)?;
        let mut trades = read_trades(file, self.parser.as_ref())?;
        sort_trades(&mut trades);
        Ok(trades)
    }

    /// Run the full pipeline for one file.
    ///
    /// Stages whose output already exists are skipped; if both exist the
    /// file is not even read.
    pub fn process_file(&self, input: &Path) -> Result<FileOutcome> {
        let file_label = input.display().to_string();
        let footprint_path = self.footprint_path(input)?;
        let agg_trade_path = self.agg_trade_path(input)?;

        let need_bars = !footprint_path.exists();
        let need_agg = !agg_trade_path.exists();
        if !need_bars && !need_agg {
            info!(file = %file_label, "skip existing file");
            return Ok(FileOutcome::Skipped);
        }

        info!(file = %file_label, "processing");
        let mut stats = ProcessingStats::default();

        let parse_start = Instant::now();
        let trades = self.parse_file(input)?;
        stats.parse_time = parse_start.elapsed();
        stats.total_trades = trades.len();
        stats.record_span(&trades);

        let write_start = Instant::now();
        if need_bars {
            let bars = build_bars(&trades, &self.symbol);
            self.bar_writer.write(&footprint_path, &bars)?;
            stats.bars = bars.len();
        }
        if need_agg {
            let runs = consolidate(&trades, self.symbol.pre_agg_duration_ms);
            write_agg_trades(&agg_trade_path, &runs, &self.symbol)?;
            stats.aggregated_trades = runs.len();
        }
        stats.write_time = write_start.elapsed();

        stats.log(&file_label);
        Ok(FileOutcome::Processed(stats))
    }
}

fn file_name(input: &Path) -> Result<&std::ffi::OsStr> {
    input
        .file_name()
        .ok_or_else(|| Error::data(format!("input path has no file name: {}", input.display())))
}
