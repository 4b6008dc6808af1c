//! Per-cycle CSV table joining cycles with their quality metrics

use serde::Serialize;
use std::io::Write;

use crate::pipeline::AnalysisReport;

#[derive(Debug, Serialize)]
struct CycleRow<'a> {
    cycle_id: usize,
    start_time: String,
    end_time: String,
    duration_seconds: f64,
    sample_count: usize,
    energy_consumption: f64,
    energy_mean: f64,
    energy_peak: f64,
    energy_stddev: f64,
    variation: f64,
    is_abnormal: bool,
    quality_score: Option<f64>,
    quality_grade: Option<&'a str>,
    is_anomalous: Option<bool>,
    issues: String,
}

/// Write one row per cycle. Metrics are joined by `cycle_id`.
pub fn write_cycle_table<W: Write>(writer: W, report: &AnalysisReport) -> Result<(), ::csv::Error> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    for cycle in &report.segmentation.cycles {
        let metric = report
            .quality
            .metrics
            .iter()
            .find(|m| m.cycle_id == cycle.cycle_id);
        wtr.serialize(CycleRow {
            cycle_id: cycle.cycle_id,
            start_time: cycle.start_time.to_rfc3339(),
            end_time: cycle.end_time.to_rfc3339(),
            duration_seconds: cycle.duration_secs,
            sample_count: cycle.sample_count,
            energy_consumption: cycle.energy_sum,
            energy_mean: cycle.energy_mean,
            energy_peak: cycle.energy_peak,
            energy_stddev: cycle.energy_stddev,
            variation: cycle.variation(),
            is_abnormal: cycle.is_abnormal,
            quality_score: metric.map(|m| m.quality_score),
            quality_grade: metric.map(|m| m.quality_grade.as_str()),
            is_anomalous: metric.map(|m| m.is_anomalous),
            issues: metric.map(|m| m.issues.join("; ")).unwrap_or_default(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
