//! Footprint batch converter - main entry point.

use anyhow::{Context, Result};
use clap::Parser;
use footprint_core::Config;
use footprint_pipeline::run;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "footprint",
    version,
    about = "Convert raw trade CSV files into footprint bars and consolidated trades"
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing raw trade CSV files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Root directory for footprint/ and aggtrade/ outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of files processed concurrently (1-64)
    #[arg(long)]
    threads: Option<usize>,

    /// Record parser name
    #[arg(long)]
    parser: Option<String>,

    /// Footprint output format: json or csv
    #[arg(long)]
    format: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Defaults, then the config file, then command-line flags.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(dir) = &self.input_dir {
            config.process.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.process.output_dir = dir.clone();
        }
        if let Some(threads) = self.threads {
            config.process.thread_count = threads;
        }
        if let Some(parser) = &self.parser {
            config.process.parser = parser.clone();
        }
        if let Some(format) = &self.format {
            config.process.output_format = format.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.load_config()?;

    info!(
        input_dir = %config.process.input_dir.display(),
        output_dir = %config.process.output_dir.display(),
        parser = %config.process.parser,
        format = %config.process.output_format,
        "starting footprint v{}",
        env!("CARGO_PKG_VERSION")
    );

    let report = match run(&config).await {
        Ok(report) => report,
        Err(e) if e.is_startup_fatal() => return Err(anyhow::Error::new(e).context("invalid configuration")),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!(
                "failed to list input directory {}",
                config.process.input_dir.display()
            )))
        }
    };

    if report.is_success() {
        info!(
            processed = report.processed,
            skipped = report.skipped,
            "all files completed"
        );
        return Ok(ExitCode::SUCCESS);
    }

    for (path, reason) in &report.failed {
        error!(file = %path.display(), "{}", reason);
    }
    error!(
        failed = report.failed.len(),
        total = report.total(),
        "batch finished with failures"
    );
    Ok(ExitCode::FAILURE)
}
