use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Conditions that abort an ingestion run. Per-row problems never reach this
/// type; they are logged and counted as skipped rows instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("no clubs known for season {0}")]
    UnknownSeason(String),

    #[error("match date {0} is after the last configured season boundary")]
    SeasonOutOfRange(NaiveDate),

    #[error("store {} already holds ingested rows; rerun with --fresh", .0.display())]
    StoreNotEmpty(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
