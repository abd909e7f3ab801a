//! Bounded parallel processing of many input files.
//!
//! Each file runs on the blocking thread pool; a semaphore caps how many
//! run at once. One file failing never stops the others.

use crate::processor::{FileOutcome, Processor};
use footprint_core::{Config, Result, MAX_THREAD_COUNT};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Files for which at least one stage ran.
    pub processed: usize,
    /// Files whose outputs already existed.
    pub skipped: usize,
    /// Files that failed, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// Total files seen.
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed.len()
    }

    /// True when no file failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// List the `.csv` files directly inside `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Process `files` with at most `concurrency` running at once.
pub async fn run_batch(processor: Arc<Processor>, files: Vec<PathBuf>, concurrency: usize) -> BatchReport {
    let limit = concurrency.clamp(1, MAX_THREAD_COUNT);
    let semaphore = Arc::new(Semaphore::new(limit));
    let total = files.len();
    info!(files = total, workers = limit, "starting batch");

    let mut report = BatchReport::default();
    let mut handles: Vec<(PathBuf, JoinHandle<Result<FileOutcome>>)> = Vec::with_capacity(total);

    for path in files {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                report.failed.push((path, e.to_string()));
                continue;
            }
        };
        let processor = Arc::clone(&processor);
        let input = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            processor.process_file(&input)
        });
        handles.push((path, handle));
    }

    for (done, (path, handle)) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(FileOutcome::Processed(_))) => report.processed += 1,
            Ok(Ok(FileOutcome::Skipped)) => report.skipped += 1,
            Ok(Err(e)) => {
                warn!(file = %path.display(), error = %e, "file failed");
                report.failed.push((path, e.to_string()));
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "worker panicked");
                report.failed.push((path, format!("worker panicked: {e}")));
            }
        }
        debug!(done = done + 1, total, "batch progress");
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "batch finished"
    );
    report
}

/// Validate `config`, discover inputs and process them.
pub async fn run(config: &Config) -> Result<BatchReport> {
    let processor = Arc::new(Processor::from_config(config)?);
    let files = discover_inputs(&config.process.input_dir)?;
    Ok(run_batch(processor, files, config.process.effective_threads()).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.csv", "notes.txt", "c.CSV.bak"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = discover_inputs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_inputs(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            processed: 2,
            skipped: 1,
            failed: vec![(PathBuf::from("x.csv"), "bad".into())],
        };
        assert_eq!(report.total(), 4);
        assert!(!report.is_success());
        assert!(BatchReport::default().is_success());
    }
}
