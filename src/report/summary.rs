//! Machine-readable run summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::loader::DataValidation;
use crate::pipeline::AnalysisReport;
use crate::types::QualityGrade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyStatistics {
    pub total_energy: f64,
    pub average_energy: f64,
    pub peak_energy: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub total_cycles: usize,
    pub abnormal_cycles: usize,
    pub anomalous_units: usize,
    pub average_quality_score: f64,
    pub grade_distribution: BTreeMap<QualityGrade, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub analysis_timestamp: DateTime<Utc>,
    pub machine: String,
    pub data_period: DataPeriod,
    pub energy_statistics: EnergyStatistics,
    pub production_summary: ProductionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_validation: Option<DataValidation>,
}

impl SummaryStatistics {
    pub fn new(
        report: &AnalysisReport,
        machine: &crate::config::MachineInfo,
        generated_at: DateTime<Utc>,
        validation: Option<&DataValidation>,
    ) -> Self {
        let profile = &report.profile;
        let summary = &report.quality.summary;
        Self {
            analysis_timestamp: generated_at,
            machine: machine.name.clone(),
            data_period: DataPeriod {
                start: profile.start,
                end: profile.end,
                duration_hours: profile.span_secs / 3600.0,
            },
            energy_statistics: EnergyStatistics {
                total_energy: profile.total_energy,
                average_energy: profile.mean_energy,
                peak_energy: profile.peak_energy,
                unit: machine.energy_unit.clone(),
            },
            production_summary: ProductionSummary {
                total_cycles: report.segmentation.statistics.total_cycles,
                abnormal_cycles: report.segmentation.statistics.abnormal_cycles,
                anomalous_units: summary.anomalous_cycles,
                average_quality_score: summary.average_quality_score,
                grade_distribution: summary.grade_distribution.clone(),
            },
            data_validation: validation.cloned(),
        }
    }
}
