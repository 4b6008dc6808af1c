//! Sample and Series: the validated, immutable input signal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};

use crate::error::{AnalysisError, Result};

/// One instantaneous energy reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Non-negative energy reading
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Seconds elapsed from `from` to `to` (microsecond resolution).
pub fn secs_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Ordered energy series with strictly increasing timestamps.
///
/// Construction validates every sample, so downstream stages can rely on
/// finite, non-negative values and a monotonic time axis. Stages never
/// mutate a series; derived series are built with [`Series::with_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct Series {
    samples: Vec<Sample>,
    sampling_interval_secs: f64,
}

impl Series {
    /// Build a series, rejecting NaN/infinite/negative values and
    /// non-increasing timestamps.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        for (i, sample) in samples.iter().enumerate() {
            if !sample.value.is_finite() {
                return Err(AnalysisError::invalid_input(
                    format!("value must be finite, got {}", sample.value),
                    Some(i),
                ));
            }
            if sample.value < 0.0 {
                return Err(AnalysisError::invalid_input(
                    format!("value must be non-negative, got {}", sample.value),
                    Some(i),
                ));
            }
            if i > 0 && sample.timestamp <= samples[i - 1].timestamp {
                return Err(AnalysisError::invalid_input(
                    format!(
                        "timestamps must be strictly increasing ({} follows {})",
                        sample.timestamp,
                        samples[i - 1].timestamp
                    ),
                    Some(i),
                ));
            }
        }

        let sampling_interval_secs = Self::median_interval(&samples);
        Ok(Self {
            samples,
            sampling_interval_secs,
        })
    }

    /// Build a uniformly sampled series starting at `start`.
    pub fn from_values(
        start: DateTime<Utc>,
        interval_secs: f64,
        values: impl IntoIterator<Item = f64>,
    ) -> Result<Self> {
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(AnalysisError::invalid_parameter(
                "interval_secs",
                interval_secs,
                "must be a positive number of seconds",
            ));
        }
        let step_us = (interval_secs * 1_000_000.0).round() as i64;
        let samples = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let offset = chrono::Duration::microseconds(step_us * i as i64);
                Sample::new(start + offset, value)
            })
            .collect();
        Self::new(samples)
    }

    fn median_interval(samples: &[Sample]) -> f64 {
        if samples.len() < 2 {
            return 0.0;
        }
        let deltas: Vec<f64> = samples
            .windows(2)
            .map(|w| secs_between(w[0].timestamp, w[1].timestamp))
            .collect();
        Data::new(deltas).median()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Energy values in index order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    /// Nominal sampling interval: median delta between consecutive samples.
    /// Zero when the series has fewer than two samples.
    pub fn sampling_interval_secs(&self) -> f64 {
        self.sampling_interval_secs
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Time between first and last sample in seconds.
    pub fn span_secs(&self) -> f64 {
        match (self.start(), self.end()) {
            (Some(a), Some(b)) => secs_between(a, b),
            _ => 0.0,
        }
    }

    /// Seconds between the samples at two indices.
    pub fn elapsed_secs(&self, from: usize, to: usize) -> f64 {
        secs_between(self.samples[from].timestamp, self.samples[to].timestamp)
    }

    /// Derive a new series on the same time axis with replaced values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.samples.len() {
            return Err(AnalysisError::invalid_input(
                format!(
                    "replacement has {} values, series has {}",
                    values.len(),
                    self.samples.len()
                ),
                None,
            ));
        }
        let samples = self
            .samples
            .iter()
            .zip(values)
            .map(|(s, v)| Sample::new(s.timestamp, v))
            .collect();
        Self::new(samples)
    }
}

impl TryFrom<Vec<Sample>> for Series {
    type Error = AnalysisError;

    fn try_from(samples: Vec<Sample>) -> Result<Self> {
        Self::new(samples)
    }
}

impl From<Series> for Vec<Sample> {
    fn from(series: Series) -> Self {
        series.samples
    }
}
