//! Plain-text analysis report

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::config::defaults::{HIGH_ANOMALY_RATE, LOW_AVERAGE_QUALITY};
use crate::config::MachineInfo;
use crate::pipeline::AnalysisReport;
use crate::types::{QualityGrade, QualitySummary};

const RULE: usize = 50;
const SUB_RULE: usize = 20;

/// Follow-up actions derived from the quality summary.
pub fn recommendations(summary: &QualitySummary) -> Vec<String> {
    let mut recs = Vec::new();
    if summary.anomalous_cycles > 0 {
        if summary.anomaly_rate() > HIGH_ANOMALY_RATE {
            recs.push("High anomalous unit rate detected. Investigate root causes.".to_string());
        } else {
            recs.push("Some anomalous units detected. Monitor production process.".to_string());
        }
    }
    if summary.has_cycles && summary.average_quality_score < LOW_AVERAGE_QUALITY {
        recs.push("Low average quality score. Review production process.".to_string());
    }
    if recs.is_empty() {
        recs.push("No significant issues detected. Continue monitoring.".to_string());
    }
    recs
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(SUB_RULE));
}

pub fn render_text(report: &AnalysisReport, machine: &MachineInfo, generated_at: DateTime<Utc>) -> String {
    let unit = &machine.energy_unit;
    let summary = &report.quality.summary;
    let stats = &report.segmentation.statistics;
    let profile = &report.profile;
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(RULE));
    let _ = writeln!(out, "MACHINE ENERGY ANALYSIS REPORT");
    let _ = writeln!(out, "{}", "=".repeat(RULE));
    let _ = writeln!(out, "Machine: {}", machine.name);
    if !machine.location.is_empty() {
        let _ = writeln!(out, "Location: {}", machine.location);
    }
    let _ = writeln!(out, "Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    if let (Some(start), Some(end)) = (profile.start, profile.end) {
        let _ = writeln!(
            out,
            "Data period: {} to {}",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S")
        );
    }
    let _ = writeln!(out);

    section(&mut out, "EXECUTIVE SUMMARY");
    let _ = writeln!(out, "Total Production Cycles: {}", stats.total_cycles);
    let _ = writeln!(out, "Anomalous Units: {}", summary.anomalous_cycles);
    let _ = writeln!(out, "Average Quality Score: {:.2}", summary.average_quality_score);
    let _ = writeln!(
        out,
        "Production Share: {:.1}% of samples",
        report.production_fraction() * 100.0
    );
    let _ = writeln!(out);

    section(&mut out, "PRODUCTION ANALYSIS");
    if stats.is_empty() {
        let _ = writeln!(out, "No production cycles detected.");
    } else {
        let _ = writeln!(out, "Average Cycle Duration: {:.1} seconds", stats.duration.mean);
        let _ = writeln!(
            out,
            "Cycle Duration Range: {:.1} - {:.1} seconds",
            stats.duration.min, stats.duration.max
        );
        let _ = writeln!(out, "Average Energy per Cycle: {:.1} {unit}", stats.energy.mean);
        let _ = writeln!(out, "Total Energy Consumed: {:.1} {unit}", stats.total_energy);
        if stats.abnormal_cycles > 0 {
            let _ = writeln!(out, "Over-long Cycles: {}", stats.abnormal_cycles);
        }
    }
    let _ = writeln!(out);

    section(&mut out, "QUALITY ASSESSMENT");
    if summary.has_cycles {
        let _ = writeln!(out, "Quality Grade Distribution:");
        for grade in QualityGrade::ALL {
            let count = summary.grade_distribution.get(&grade).copied().unwrap_or(0);
            let _ = writeln!(out, "  Grade {grade}: {count} cycles");
        }
    } else {
        let _ = writeln!(out, "No cycles to assess.");
    }
    let _ = writeln!(out);

    if !summary.anomalous_cycle_ids.is_empty() {
        section(&mut out, "ANOMALOUS UNITS");
        let _ = writeln!(out, "Found {} anomalous units:", summary.anomalous_cycle_ids.len());
        for metric in report.quality.metrics.iter().filter(|m| m.is_anomalous) {
            let _ = writeln!(out, "  Cycle ID: {} ({})", metric.cycle_id, metric.issues.join("; "));
        }
        let _ = writeln!(out);
    }

    section(&mut out, "ENERGY STATISTICS");
    let _ = writeln!(out, "Total Energy: {:.1} {unit}", profile.total_energy);
    let _ = writeln!(out, "Average Energy: {:.1} {unit}", profile.mean_energy);
    let _ = writeln!(out, "Peak Energy: {:.1} {unit}", profile.peak_energy);
    let _ = writeln!(out, "Minimum Energy: {:.1} {unit}", profile.min_energy);
    let _ = writeln!(out);

    section(&mut out, "RECOMMENDATIONS");
    for (i, rec) in recommendations(summary).iter().enumerate() {
        let _ = writeln!(out, "{}. {rec}", i + 1);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "=".repeat(RULE));
    let _ = writeln!(out, "END OF REPORT");
    let _ = writeln!(out, "{}", "=".repeat(RULE));
    out
}
