//! Record parsers for CSV, JSON and whitespace text input

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::io::{BufRead, Read};
use std::path::Path;
use tracing::warn;

use super::{LoaderError, RawRecord};
use crate::config::LoaderConfig;

/// Parse errors reported individually before switching to a summary count.
const MAX_REPORTED_ROW_ERRORS: usize = 10;

/// Parse a timestamp in any of the accepted forms.
///
/// Numeric values are Unix seconds; integers above 10^10 are taken as
/// milliseconds. Strings without an offset are read as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Err("empty timestamp".to_string());
    }

    if let Ok(epoch) = s.parse::<i64>() {
        let parsed = if epoch > 10_000_000_000 {
            Utc.timestamp_millis_opt(epoch).single()
        } else {
            Utc.timestamp_opt(epoch, 0).single()
        };
        return parsed.ok_or_else(|| format!("timestamp out of range: '{s}'"));
    }
    if let Ok(epoch) = s.parse::<f64>() {
        if epoch.is_finite() {
            let micros = (epoch * 1_000_000.0).round() as i64;
            return Utc
                .timestamp_micros(micros)
                .single()
                .ok_or_else(|| format!("timestamp out of range: '{s}'"));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }

    Err(format!("cannot parse timestamp: '{s}'"))
}

/// Parse an energy cell. Blank and NaN-like cells are missing values.
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") || s == "-" {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn report_row_error(errors: &mut usize, line: usize, message: &str) {
    if *errors < MAX_REPORTED_ROW_ERRORS {
        warn!(line, error = %message, "Skipping unparseable row");
    }
    *errors += 1;
}

// ============================================================================
// CSV
// ============================================================================

pub fn parse_csv<R: Read>(reader: R, config: &LoaderConfig, source: &Path) -> Result<Vec<RawRecord>, LoaderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let csv_err = |e: csv::Error| LoaderError::Csv {
        path: source.to_path_buf(),
        source: e,
    };
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let column = |name: &str| -> Result<usize, LoaderError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoaderError::MissingColumn {
                path: source.to_path_buf(),
                column: name.to_string(),
            })
    };
    let ts_idx = column(&config.timestamp_column)?;
    let value_idx = column(&config.value_column)?;

    let mut records = Vec::new();
    let mut errors = 0usize;
    for (row, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = row + 2;
        let record = result.map_err(csv_err)?;
        let Some(ts) = record.get(ts_idx) else {
            report_row_error(&mut errors, line, "missing timestamp field");
            continue;
        };
        match parse_timestamp(ts) {
            Ok(timestamp) => records.push(RawRecord {
                timestamp,
                value: record.get(value_idx).and_then(parse_value),
            }),
            Err(e) => report_row_error(&mut errors, line, &e),
        }
    }
    if errors > MAX_REPORTED_ROW_ERRORS {
        warn!(errors, path = %source.display(), "Further row errors suppressed");
    }
    Ok(records)
}

// ============================================================================
// JSON
// ============================================================================

/// Array of objects carrying the configured timestamp and value keys.
pub fn parse_json<R: Read>(reader: R, config: &LoaderConfig, source: &Path) -> Result<Vec<RawRecord>, LoaderError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(reader).map_err(|e| LoaderError::Json {
            path: source.to_path_buf(),
            source: e,
        })?;

    let mut records = Vec::with_capacity(rows.len());
    let mut errors = 0usize;
    for (i, row) in rows.iter().enumerate() {
        let timestamp = match row.get(&config.timestamp_column) {
            Some(serde_json::Value::String(s)) => parse_timestamp(s),
            Some(serde_json::Value::Number(n)) => parse_timestamp(&n.to_string()),
            _ => Err(format!("missing '{}'", config.timestamp_column)),
        };
        let value = match row.get(&config.value_column) {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => parse_value(s),
            _ => None,
        };
        match timestamp {
            Ok(timestamp) => records.push(RawRecord { timestamp, value }),
            Err(e) => report_row_error(&mut errors, i + 1, &e),
        }
    }
    Ok(records)
}

// ============================================================================
// Text
// ============================================================================

/// One record per line: everything before the last field is the timestamp.
///
/// Fields are comma-separated when the line contains a comma, otherwise
/// whitespace-separated. `#` starts a comment line; header lines fail to
/// parse and are skipped.
pub fn parse_text<R: BufRead>(reader: R, source: &Path) -> Result<Vec<RawRecord>, LoaderError> {
    let mut records = Vec::new();
    let mut errors = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LoaderError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = if line.contains(',') {
            line.split(',').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };
        if parts.len() < 2 {
            report_row_error(&mut errors, i + 1, "expected a timestamp and a value");
            continue;
        }
        let (ts_parts, value) = parts.split_at(parts.len() - 1);
        let Some(value) = value[0].parse::<f64>().ok() else {
            report_row_error(&mut errors, i + 1, &format!("cannot parse value '{}'", value[0]));
            continue;
        };
        match parse_timestamp(&ts_parts.join(" ")) {
            Ok(timestamp) => records.push(RawRecord {
                timestamp,
                value: Some(value).filter(|v| v.is_finite()),
            }),
            Err(e) => report_row_error(&mut errors, i + 1, &e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> &'static Path {
        Path::new("inline")
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        for s in [
            "2024-01-15T08:30:00Z",
            "2024-01-15T08:30:00+00:00",
            "2024-01-15 08:30:00",
            "2024-01-15T08:30:00",
            "2024-01-15 08:30:00.000",
            "1705307400",
            "1705307400000",
        ] {
            assert_eq!(parse_timestamp(s).unwrap(), expected, "failed on {s}");
        }
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_parse_timestamp_offset_converted() {
        let dt = parse_timestamp("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_value_missing_markers() {
        assert_eq!(parse_value(" 12.5 "), Some(12.5));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("null"), None);
        assert_eq!(parse_value("abc"), None);
    }

    #[test]
    fn test_csv_with_custom_columns() {
        let data = "time,power_kw,extra\n2024-01-15 08:00:00,4.5,x\n2024-01-15 08:00:01,,y\n";
        let config = LoaderConfig {
            timestamp_column: "time".into(),
            value_column: "power_kw".into(),
            ..LoaderConfig::default()
        };
        let records = parse_csv(data.as_bytes(), &config, src()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, Some(4.5));
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_csv_missing_column() {
        let data = "timestamp,power\n2024-01-15 08:00:00,4.5\n";
        let err = parse_csv(data.as_bytes(), &LoaderConfig::default(), src()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { ref column, .. } if column == "value"));
    }

    #[test]
    fn test_csv_bad_timestamp_row_skipped() {
        let data = "timestamp,value\nnot-a-time,1.0\n2024-01-15 08:00:01,2.0\n";
        let records = parse_csv(data.as_bytes(), &LoaderConfig::default(), src()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_json_records() {
        let data = r#"[
            {"timestamp": "2024-01-15T08:00:00Z", "value": 3.0},
            {"timestamp": 1705305601, "value": null},
            {"timestamp": "2024-01-15T08:00:02Z", "value": "7.5"}
        ]"#;
        let records = parse_json(data.as_bytes(), &LoaderConfig::default(), src()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].value, None);
        assert_eq!(records[2].value, Some(7.5));
    }

    #[test]
    fn test_text_lines() {
        let data = "# energy dump\ntimestamp value\n2024-01-15 08:00:00 1.5\n2024-01-15 08:00:01\t2.5\n2024-01-15T08:00:02Z,3.5\n";
        let records = parse_text(data.as_bytes(), src()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].value, Some(3.5));
    }
}
