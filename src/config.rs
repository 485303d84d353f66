use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::{AnalyzerError, Result};

pub const SETTINGS_FILE: &str = "margin_analyzer.json";
pub const ENDPOINT_ENV: &str = "MARGIN_ANALYZER_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch_endpoint: String,
    pub fetch_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub exclude_misc_default: bool,
    pub last_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_endpoint: "http://localhost:8080/api/sales-orders".into(),
            fetch_timeout_secs: 30,
            output_dir: PathBuf::from("."),
            exclude_misc_default: true,
            last_file: None,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file gives the defaults, as does
    /// an unreadable one (with a warning).
    pub fn load(path: &Path) -> Self {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                settings.fetch_endpoint = endpoint;
            }
        }
        settings
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(AnalyzerError::Config("fetch_timeout_secs must be positive".into()));
        }
        if !self.fetch_endpoint.starts_with("http://") && !self.fetch_endpoint.starts_with("https://") {
            return Err(AnalyzerError::Config(format!(
                "fetch_endpoint must be an http(s) URL, got '{}'",
                self.fetch_endpoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("nope.json"));
        assert_eq!(s.fetch_timeout_secs, 30);
        assert!(s.exclude_misc_default);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"exclude_misc_default": false}"#).unwrap();

        let mut s = Settings::load(&path);
        assert!(!s.exclude_misc_default);
        assert_eq!(s.fetch_timeout_secs, 30);

        s.last_file = Some(PathBuf::from("orders.csv"));
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path).last_file, Some(PathBuf::from("orders.csv")));
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(&path).output_dir, PathBuf::from("."));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let s = Settings { fetch_timeout_secs: 0, ..Settings::default() };
        assert!(s.validate().is_err());
        let s = Settings { fetch_endpoint: "ftp://x".into(), ..Settings::default() };
        assert!(s.validate().is_err());
    }
}
