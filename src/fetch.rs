//! Live ingestion from the sales-order API.
//!
//! `GET <endpoint>?supplier_id=..&start_date=MM/DD/YYYY&end_date=MM/DD/YYYY`
//! returning a JSON array with the same fields as a batch file.

use crate::cache::SourceId;
use crate::error::{AnalyzerError, Result};
use crate::loader::{parse_json, Dataset};
use chrono::NaiveDate;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{info, warn};

pub const DATE_FORMAT: &str = "%m/%d/%Y";

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| AnalyzerError::InvalidDate(text.trim().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub supplier_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchRequest {
    /// Validates the dates before anything goes over the wire.
    pub fn new(supplier_id: &str, start: &str, end: &str) -> Result<Self> {
        let supplier_id = supplier_id.trim();
        if supplier_id.is_empty() {
            return Err(AnalyzerError::Config("supplier id is required".into()));
        }
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if start > end {
            return Err(AnalyzerError::InvalidDateRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self {
            supplier_id: supplier_id.to_string(),
            start,
            end,
        })
    }

    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("supplier_id", self.supplier_id.clone()),
            ("start_date", self.start.format(DATE_FORMAT).to_string()),
            ("end_date", self.end.format(DATE_FORMAT).to_string()),
        ]
    }

    pub fn source_id(&self, endpoint: &str) -> SourceId {
        let [(_, id), (_, start), (_, end)] = self.query();
        SourceId::from_parts(&[endpoint, &id, &start, &end])
    }

    pub fn label(&self) -> String {
        let [(_, id), (_, start), (_, end)] = self.query();
        format!("supplier {} ({} - {})", id, start, end)
    }
}

/// Blocking HTTP client for the sales-order endpoint.
pub struct SalesApiClient {
    client: Client,
    endpoint: String,
}

impl SalesApiClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fetch(&self, req: &FetchRequest) -> Result<Dataset> {
        info!(endpoint = %self.endpoint, supplier = %req.supplier_id, "fetching sales orders");

        let resp = self.client.get(&self.endpoint).query(&req.query()).send()?;
        let status = resp.status();
        let body = resp.bytes()?;

        let dataset = dataset_from_response(
            status.as_u16(),
            &body,
            req.source_id(&self.endpoint),
            &req.label(),
        )?;
        info!(
            accepted = dataset.records.len(),
            rejected = dataset.rejected_total(),
            "fetched sales records"
        );
        Ok(dataset)
    }
}

/// Turns a raw HTTP response into a dataset. Non-2xx statuses and
/// malformed bodies are errors; no partial data is returned.
pub fn dataset_from_response(status: u16, body: &[u8], source: SourceId, label: &str) -> Result<Dataset> {
    if !(200..300).contains(&status) {
        let text = String::from_utf8_lossy(body);
        let snippet: String = text.chars().take(200).collect();
        warn!(status, "sales API returned an error status");
        return Err(AnalyzerError::Status { status, body: snippet });
    }
    let rows = parse_json(body)?;
    Ok(Dataset::from_raw(source, label, &rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FetchRequest {
        FetchRequest::new("  4711 ", "01/01/2024", "03/31/2024").unwrap()
    }

    #[test]
    fn dates_use_month_day_year() {
        assert_eq!(parse_date("02/29/2024").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(matches!(parse_date("2024-02-29"), Err(AnalyzerError::InvalidDate(_))));
        assert!(matches!(parse_date("13/01/2024"), Err(AnalyzerError::InvalidDate(_))));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = FetchRequest::new("4711", "03/31/2024", "01/01/2024").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidDateRange { .. }));
        assert!(FetchRequest::new("", "01/01/2024", "01/02/2024").is_err());
    }

    #[test]
    fn query_parameters() {
        let q = request().query();
        assert_eq!(q[0], ("supplier_id", "4711".to_string()));
        assert_eq!(q[1], ("start_date", "01/01/2024".to_string()));
        assert_eq!(q[2], ("end_date", "03/31/2024".to_string()));
        assert_eq!(request().label(), "supplier 4711 (01/01/2024 - 03/31/2024)");
    }

    #[test]
    fn source_id_tracks_request_and_endpoint() {
        let a = request().source_id("http://host/api");
        assert_eq!(a, request().source_id("http://host/api"));
        assert_ne!(a, request().source_id("http://other/api"));
        let later = FetchRequest::new("4711", "01/01/2024", "04/01/2024").unwrap();
        assert_ne!(a, later.source_id("http://host/api"));
    }

    #[test]
    fn error_status_is_reported() {
        let src = request().source_id("x");
        let err = dataset_from_response(502, b"bad gateway", src, "x").unwrap_err();
        match err {
            AnalyzerError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn malformed_body_is_reported() {
        let src = request().source_id("x");
        let err = dataset_from_response(200, b"<html>", src, "x").unwrap_err();
        assert!(matches!(err, AnalyzerError::Json(_)));
    }

    #[test]
    fn good_body_becomes_dataset() {
        let body = br#"[{"Sell Price": 100, "Item Cost": 55, "price_library_id": "JOBBER_SMALL",
                        "Supplier Name": "Acme", "Sales Discount Group": "100"}]"#;
        let src = request().source_id("x");
        let ds = dataset_from_response(200, body, src.clone(), "live").unwrap();
        assert_eq!(ds.source, src);
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.label, "live");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = SalesApiClient::new("http://localhost:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/api");
    }
}
