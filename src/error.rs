//! Error types for the margin analyzer.
//!
//! Row-level data problems are not errors: they are counted as rejects by the
//! loader. Everything here aborts a load, a fetch or a report write.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("unsupported file format '{0}' (expected .xlsx, .csv or .json)")]
    UnsupportedFormat(String),

    #[error("invalid date '{0}' (expected MM/DD/YYYY)")]
    InvalidDate(String),

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("configuration error: {0}")]
    Config(String),
}
