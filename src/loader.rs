//! Batch ingestion of sales-order files.
//!
//! Three containers are accepted: an Excel workbook (first sheet), CSV with a
//! header row, and a JSON array of objects. All must carry the columns in
//! `REQUIRED_COLUMNS`.

use crate::cache::SourceId;
use crate::error::{AnalyzerError, Result};
use crate::model::{Cell, RawRecord, RejectReason, SalesRecord, REQUIRED_COLUMNS};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Xlsx,
    Csv,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(FileFormat::Xlsx),
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            _ => Err(AnalyzerError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Validated records plus what was dropped on the way in.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub source: SourceId,
    pub label: String,
    pub records: Vec<SalesRecord>,
    pub rejected: BTreeMap<RejectReason, usize>,
}

impl Dataset {
    pub fn from_raw(source: SourceId, label: impl Into<String>, rows: &[RawRecord]) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = BTreeMap::new();

        for row in rows {
            match SalesRecord::from_raw(row) {
                Ok(rec) => records.push(rec),
                Err(reason) => *rejected.entry(reason).or_insert(0) += 1,
            }
        }

        for (reason, count) in &rejected {
            debug!(%reason, count, "rows rejected");
        }

        Dataset {
            source,
            label: label.into(),
            records,
            rejected,
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// CSV fields are read as text. Numbers are parsed afterwards, so `007` keeps
/// its leading zeros and a stray `true` only spoils its own field.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Sell Price")]
    sell_price: Option<String>,
    #[serde(rename = "Item Cost")]
    item_cost: Option<String>,
    #[serde(rename = "price_library_id")]
    price_library_id: Option<String>,
    #[serde(rename = "Supplier Name")]
    supplier_name: Option<String>,
    #[serde(rename = "Sales Discount Group")]
    discount_group: Option<String>,
}

impl From<CsvRow> for RawRecord {
    fn from(row: CsvRow) -> Self {
        RawRecord::from_cells(
            [
                row.sell_price,
                row.item_cost,
                row.price_library_id,
                row.supplier_name,
                row.discount_group,
            ]
            .map(|f| f.map(Cell::Text)),
        )
    }
}

pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(AnalyzerError::MissingColumn(col.to_string()));
        }
    }

    let mut rows = Vec::new();
    for result in csv_reader.deserialize::<CsvRow>() {
        rows.push(RawRecord::from(result?));
    }
    Ok(rows)
}

fn xlsx_cell(data: &Data) -> Option<Cell> {
    match data {
        Data::Int(i) => Some(Cell::Number(*i as f64)),
        Data::Float(f) => Some(Cell::Number(*f)),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Cell::Text(s.clone())),
        Data::Bool(b) => Some(Cell::Bool(*b)),
        Data::DateTime(_) | Data::Error(_) | Data::Empty => None,
    }
}

/// Reads the first worksheet. Row one is the header.
pub fn parse_xlsx(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(AnalyzerError::EmptyWorkbook)??;

    let mut sheet_rows = range.rows();
    let header: Vec<String> = sheet_rows
        .next()
        .map(|cells| cells.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let mut columns = [0usize; 5];
    for (slot, col) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h == col)
            .ok_or_else(|| AnalyzerError::MissingColumn(col.to_string()))?;
    }

    Ok(sheet_rows
        .map(|cells| RawRecord::from_cells(columns.map(|i| cells.get(i).and_then(xlsx_cell))))
        .collect())
}

pub fn parse_json<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn parse_bytes(bytes: &[u8], format: FileFormat) -> Result<Vec<RawRecord>> {
    match format {
        FileFormat::Xlsx => parse_xlsx(bytes),
        FileFormat::Csv => parse_csv(bytes),
        FileFormat::Json => parse_json(bytes),
    }
}

/// Identity of a file on disk without parsing it, so a reload of unchanged
/// bytes can be served from the dataset cache.
pub fn fingerprint_file(path: &Path) -> Result<(SourceId, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    Ok((SourceId::from_bytes(&bytes), bytes))
}

pub fn load_dataset_bytes(bytes: &[u8], format: FileFormat, label: &str) -> Result<Dataset> {
    let rows = parse_bytes(bytes, format)?;
    let dataset = Dataset::from_raw(SourceId::from_bytes(bytes), label, &rows);
    info!(
        file = label,
        accepted = dataset.records.len(),
        rejected = dataset.rejected_total(),
        "loaded sales records"
    );
    Ok(dataset)
}
