//! Configuration structures for the footprint system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound on concurrently processed files.
pub const MAX_THREAD_COUNT: usize = 64;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bar and consolidation parameters.
    pub symbol: SymbolConfig,
    /// Batch processing parameters.
    pub process: ProcessConfig,
}

impl Config {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Check that every value is usable before any file is touched.
    pub fn validate(&self) -> Result<()> {
        self.symbol.validate()?;
        self.process.validate()
    }
}

/// Instrument-specific bar configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    /// Bar duration in seconds.
    pub duration: i64,
    /// Price bucket width in units of the smallest price increment.
    pub scale: u32,
    /// Decimal places for volumes.
    pub volume_precision: u32,
    /// Decimal places for prices.
    pub price_precision: u32,
    /// Consolidation window in milliseconds.
    pub pre_agg_duration_ms: i64,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            duration: 300,
            scale: 100,
            volume_precision: 2,
            price_precision: 1,
            pre_agg_duration_ms: 100,
        }
    }
}

impl SymbolConfig {
    /// Price-axis width of one price level: `scale * 10^-price_precision`.
    pub fn bucket_height(&self) -> f64 {
        self.scale as f64 * 10f64.powi(-(self.price_precision as i32))
    }

    /// Reject values that would make bucketing or windowing meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.duration <= 0 {
            return Err(Error::config("symbol.duration must be positive"));
        }
        if self.scale == 0 {
            return Err(Error::config("symbol.scale must be positive"));
        }
        if self.pre_agg_duration_ms <= 0 {
            return Err(Error::config("symbol.pre_agg_duration_ms must be positive"));
        }
        if self.price_precision > 12 || self.volume_precision > 12 {
            return Err(Error::config("precision must be at most 12 decimal places"));
        }
        Ok(())
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Directory scanned for `*.csv` trade files.
    pub input_dir: PathBuf,
    /// Root of the `footprint/` and `aggtrade/` output directories.
    pub output_dir: PathBuf,
    /// Number of files processed concurrently.
    pub thread_count: usize,
    /// Record parser name (e.g., "binance").
    pub parser: String,
    /// Footprint output format name ("json" or "csv").
    pub output_format: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data"),
            thread_count: 4,
            parser: "binance".to_string(),
            output_format: "json".to_string(),
        }
    }
}

impl ProcessConfig {
    /// Thread count clamped to `[1, MAX_THREAD_COUNT]`.
    pub fn effective_threads(&self) -> usize {
        self.thread_count.clamp(1, MAX_THREAD_COUNT)
    }

    fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(Error::config("process.thread_count must be at least 1"));
        }
        Ok(())
    }
}
