//! Centered rolling-window smoothing
//!
//! Windows are clipped to the series length, and positions near either edge
//! use whatever part of the window is available instead of producing gaps.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Rolling statistic applied to the raw signal before thresholding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    /// Centered rolling mean
    #[default]
    Mean,
    /// Centered rolling median (keeps step edges sharp)
    Median,
}

impl Smoothing {
    pub fn apply(&self, values: &[f64], window: usize) -> Vec<f64> {
        match self {
            Smoothing::Mean => rolling_mean(values, window),
            Smoothing::Median => rolling_median(values, window),
        }
    }
}

/// Samples before and after the centre for a window of `window` samples.
/// Even windows lean one sample to the right.
pub fn half_widths(window: usize) -> (usize, usize) {
    let window = window.max(1);
    let left = (window - 1) / 2;
    (left, window - 1 - left)
}

/// Inclusive index bounds of the window centred on `i`.
pub(crate) fn window_bounds(i: usize, len: usize, window: usize) -> (usize, usize) {
    let (left, right) = half_widths(window);
    (i.saturating_sub(left), (i + right).min(len - 1))
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let window = window.clamp(1, n);
    (0..n)
        .map(|i| {
            let (lo, hi) = window_bounds(i, n, window);
            values[lo..=hi].iter().mean()
        })
        .collect()
}

pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let window = window.clamp(1, n);
    (0..n)
        .map(|i| {
            let (lo, hi) = window_bounds(i, n, window);
            Data::new(values[lo..=hi].to_vec()).median()
        })
        .collect()
}
