//! JSON persistence of batch reports.
//!
//! Files are named `batch-report-<unix-ms>-<batch-id>.json` and never
//! overwritten. The stored document is the report plus a `summary`
//! snapshot for readers that do not recompute it.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::report::aggregator::{BatchReport, Summary};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct PersistedReport<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    summary: Summary,
}

#[derive(Deserialize)]
struct SummarySnapshot {
    summary: Summary,
}

pub fn file_name(report: &BatchReport) -> String {
    format!("batch-report-{}-{}.json", report.started_at, report.batch_id)
}

/// Write `report` into `dir`, creating the directory if needed.
pub fn persist(report: &BatchReport, dir: &Path) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(report));

    let document = PersistedReport {
        report,
        summary: report.summary(),
    };
    let json = serde_json::to_vec_pretty(&document)?;

    // create_new: an existing report is never replaced
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(&json)?;
    file.sync_all()?;

    tracing::info!(path = %path.display(), outcomes = report.outcomes.len(), "Batch report saved");
    Ok(path)
}

/// Read a persisted report. The stored summary snapshot is ignored.
pub fn load(path: &Path) -> Result<BatchReport, ReportError> {
    let content = fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// Read only the summary snapshot written alongside the report.
pub fn load_summary_snapshot(path: &Path) -> Result<Summary, ReportError> {
    let content = fs::read(path)?;
    let snapshot: SummarySnapshot = serde_json::from_slice(&content)?;
    Ok(snapshot.summary)
}
