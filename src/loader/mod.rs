//! Loader: energy records from files to a validated Series
//!
//! Supported inputs:
//! - CSV with a header row (column names from [`LoaderConfig`])
//! - JSON array of `{ timestamp, value }` objects
//! - Text dumps with one `timestamp value` record per line
//!
//! The format is taken from the config, or detected from the extension.

pub mod parse;
pub mod preprocess;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::LoaderConfig;
use crate::error::AnalysisError;
use crate::types::Series;

pub use preprocess::DataValidation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Csv,
    Json,
    Txt,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            "txt" | "dat" | "log" => Some(InputFormat::Txt),
            _ => None,
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "txt" | "text" => Ok(InputFormat::Txt),
            other => Err(LoaderError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Data file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No valid data found in {0}")]
    NoValidData(PathBuf),

    #[error("Resampling at {step_secs} s would produce {bins} bins")]
    TooManyBins { bins: i64, step_secs: f64 },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// One parsed record; `value` is `None` where the source had no reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Result of loading one file.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub source: PathBuf,
    pub format: InputFormat,
    pub validation: DataValidation,
    pub series: Series,
}

/// Parse every record of `path` without repairing anything.
pub fn load_records(path: &Path, config: &LoaderConfig) -> Result<(InputFormat, Vec<RawRecord>), LoaderError> {
    if !path.exists() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }
    let format = match config.format {
        Some(f) => f,
        None => InputFormat::from_path(path).ok_or_else(|| {
            LoaderError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("<none>")
                    .to_string(),
            )
        })?,
    };

    let file = File::open(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);
    let records = match format {
        InputFormat::Csv => parse::parse_csv(reader, config, path)?,
        InputFormat::Json => parse::parse_json(reader, config, path)?,
        InputFormat::Txt => parse::parse_text(reader, path)?,
    };
    if records.is_empty() {
        return Err(LoaderError::NoValidData(path.to_path_buf()));
    }
    info!(path = %path.display(), records = records.len(), ?format, "Loaded records");
    Ok((format, records))
}

/// Load, validate and preprocess `path` into a Series.
pub fn load_series(path: &Path, config: &LoaderConfig) -> Result<LoadedData, LoaderError> {
    let (format, records) = load_records(path, config)?;
    let validation = preprocess::validate_records(&records, config.max_missing_fraction);
    let series = preprocess::preprocess(&records, config, path)?;
    Ok(LoadedData {
        source: path.to_path_buf(),
        format,
        validation,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(InputFormat::from_path(Path::new("a/b.CSV")), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_path(Path::new("dump.txt")), Some(InputFormat::Txt));
        assert_eq!(InputFormat::from_path(Path::new("x.json")), Some(InputFormat::Json));
        assert_eq!(InputFormat::from_path(Path::new("x.parquet")), None);
        assert_eq!(InputFormat::from_path(Path::new("noext")), None);
        assert_eq!("TEXT".parse::<InputFormat>().unwrap(), InputFormat::Txt);
    }

    #[test]
    fn test_missing_file() {
        let err = load_series(Path::new("/no/such/file.csv"), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        std::fs::write(
            &path,
            "timestamp,value\n2024-01-15 08:00:00,1.0\n2024-01-15 08:00:01,\n2024-01-15 08:00:02,3.0\n",
        )
        .unwrap();
        let loaded = load_series(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(loaded.format, InputFormat::Csv);
        assert_eq!(loaded.series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(loaded.validation.missing_values, 1);
    }
}
