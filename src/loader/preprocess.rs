//! Raw records to a validated, gap-free Series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{LoaderError, RawRecord};
use crate::config::LoaderConfig;
use crate::state::outliers::interpolate_gaps;
use crate::types::{secs_between, Series};

/// Upper bound on resampled grid size, to catch unit mistakes early.
const MAX_RESAMPLED_BINS: i64 = 50_000_000;

/// Quality summary of the raw records, computed before any repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidation {
    pub valid: bool,
    pub total_records: usize,
    pub missing_values: usize,
    pub negative_values: usize,
    pub zero_values: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub span_secs: f64,
    pub error: Option<String>,
    pub warning: Option<String>,
}

pub fn validate_records(records: &[RawRecord], max_missing_fraction: f64) -> DataValidation {
    let missing_values = records.iter().filter(|r| r.value.is_none()).count();
    let negative_values = records.iter().filter(|r| r.value.is_some_and(|v| v < 0.0)).count();
    let zero_values = records.iter().filter(|r| r.value == Some(0.0)).count();
    let start_time = records.iter().map(|r| r.timestamp).min();
    let end_time = records.iter().map(|r| r.timestamp).max();
    let span_secs = match (start_time, end_time) {
        (Some(a), Some(b)) => secs_between(a, b),
        _ => 0.0,
    };

    let mut validation = DataValidation {
        valid: true,
        total_records: records.len(),
        missing_values,
        negative_values,
        zero_values,
        start_time,
        end_time,
        span_secs,
        error: None,
        warning: None,
    };

    if records.is_empty() {
        validation.valid = false;
        validation.error = Some("No data available".to_string());
    } else if missing_values as f64 > records.len() as f64 * max_missing_fraction {
        validation.valid = false;
        validation.error = Some("Too many missing values".to_string());
    }
    if negative_values > 0 {
        validation.warning = Some("Negative energy values detected".to_string());
    }

    info!(
        records = validation.total_records,
        missing = validation.missing_values,
        negative = validation.negative_values,
        valid = validation.valid,
        "Data validation completed"
    );
    validation
}

/// Sort, optionally resample, and repair gaps.
///
/// Negative readings are physically impossible and are treated as gaps.
/// Gaps are filled by time-linear interpolation; leading and trailing gaps
/// take the nearest known value.
pub fn preprocess(records: &[RawRecord], config: &LoaderConfig, source: &std::path::Path) -> Result<Series, LoaderError> {
    let mut sorted: Vec<RawRecord> = records
        .iter()
        .map(|r| RawRecord {
            timestamp: r.timestamp,
            value: r.value.filter(|v| *v >= 0.0),
        })
        .collect();
    sorted.sort_by_key(|r| r.timestamp);

    let (timestamps, values) = if config.resample {
        resample(&sorted, config.resample_secs)?
    } else {
        merge_duplicates(&sorted)
    };

    let filled = interpolate_gaps(&timestamps, &values).ok_or_else(|| LoaderError::NoValidData(source.to_path_buf()))?;
    let gaps = values.iter().filter(|v| v.is_none()).count();
    if gaps > 0 {
        warn!(gaps, "Filled missing values by interpolation");
    }

    let samples = timestamps
        .into_iter()
        .zip(filled)
        .map(|(t, v)| crate::types::Sample::new(t, v))
        .collect();
    let series = Series::new(samples)?;
    info!(
        samples = series.len(),
        interval_secs = series.sampling_interval_secs(),
        "Preprocessed data"
    );
    Ok(series)
}

/// Collapse records sharing a timestamp into their mean.
fn merge_duplicates(sorted: &[RawRecord]) -> (Vec<DateTime<Utc>>, Vec<Option<f64>>) {
    let mut timestamps: Vec<DateTime<Utc>> = Vec::with_capacity(sorted.len());
    let mut acc: Vec<(f64, usize)> = Vec::with_capacity(sorted.len());
    for r in sorted {
        if timestamps.last() != Some(&r.timestamp) {
            timestamps.push(r.timestamp);
            acc.push((0.0, 0));
        }
        if let (Some(v), Some(slot)) = (r.value, acc.last_mut()) {
            slot.0 += v;
            slot.1 += 1;
        }
    }
    let values = acc
        .into_iter()
        .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
        .collect();
    (timestamps, values)
}

/// Mean of the known values in each fixed-width bin. Bins are aligned to
/// whole multiples of the step since the Unix epoch; empty bins are gaps.
fn resample(sorted: &[RawRecord], step_secs: f64) -> Result<(Vec<DateTime<Utc>>, Vec<Option<f64>>), LoaderError> {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Ok((Vec::new(), Vec::new()));
    };
    let step_us = ((step_secs * 1_000_000.0).round() as i64).max(1);
    let origin = first.timestamp.timestamp_micros().div_euclid(step_us) * step_us;
    let bins = (last.timestamp.timestamp_micros() - origin) / step_us + 1;
    if bins > MAX_RESAMPLED_BINS {
        return Err(LoaderError::TooManyBins { bins, step_secs });
    }

    let mut acc = vec![(0.0f64, 0usize); bins as usize];
    for r in sorted {
        let idx = ((r.timestamp.timestamp_micros() - origin) / step_us) as usize;
        if let Some(v) = r.value {
            acc[idx].0 += v;
            acc[idx].1 += 1;
        }
    }

    let mut timestamps = Vec::with_capacity(acc.len());
    for i in 0..bins {
        let t = DateTime::<Utc>::from_timestamp_micros(origin + i * step_us)
            .ok_or(LoaderError::TooManyBins { bins, step_secs })?;
        timestamps.push(t);
    }
    let values = acc
        .into_iter()
        .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
        .collect();
    Ok((timestamps, values))
}
