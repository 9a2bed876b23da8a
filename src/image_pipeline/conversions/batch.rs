//! Batch export of every capture under a directory tree.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::image_pipeline::common::error::{CaptureError, Result};
use crate::image_pipeline::conversions::capture_to_tiff::{CaptureExporter, ExportSummary};

/// File extension of camera capture files.
pub const CAPTURE_EXTENSION: &str = "bin";

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<ExportSummary>,
    pub failed: Vec<(PathBuf, CaptureError)>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Recursively collects `*.bin` files under `root`, sorted by path.
pub fn discover_captures<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_captures(root.as_ref(), &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_captures(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_captures(&path, found)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some(CAPTURE_EXTENSION) {
            found.push(path);
        }
    }
    Ok(())
}

/// Exports every capture under `root`, one thread per file, and waits for all of them.
///
/// A failed job is logged and reported; it does not affect the others.
pub fn export_all<P: AsRef<Path>>(root: P, exporter: &CaptureExporter) -> Result<BatchReport> {
    let captures = discover_captures(root)?;
    info!(count = captures.len(), "Exporting captures");

    let handles: Vec<_> = captures
        .into_iter()
        .map(|path| {
            info!("Exporting: {}", path.display());
            exporter.spawn(path)
        })
        .collect();

    let mut report = BatchReport::default();
    for handle in handles {
        let source = handle.source().to_path_buf();
        match handle.join() {
            Ok(summary) => {
                info!(pages = summary.pages, "Exported {}", summary.tiff_path.display());
                report.succeeded.push(summary);
            }
            Err(e) => {
                error!("Export of {} failed: {}", source.display(), e);
                report.failed.push((source, e));
            }
        }
    }

    Ok(report)
}
