//! Property Tests
//!
//! Structural guarantees that must hold for any valid input series.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use machine_analyzer::pipeline::{analyze, PipelineConfig};
use machine_analyzer::quality::QualityScorer;
use machine_analyzer::segmentation::{CycleSegmenter, SegmentationConfig};
use machine_analyzer::types::{MachineState, QualityGrade, Series, StateMask};

fn series(values: Vec<f64>) -> Series {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    Series::from_values(t0, 1.0, values).unwrap()
}

/// Piecewise-constant signal: blocks of off, standby and production levels.
fn blocky_values() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec((prop_oneof![Just(0.0), Just(2.0), 10.0_f64..60.0], 1usize..40), 1..=25)
        .prop_map(|blocks| {
            blocks
                .into_iter()
                .flat_map(|(level, len)| std::iter::repeat(level).take(len))
                .collect()
        })
}

fn state_strategy() -> impl Strategy<Value = MachineState> {
    prop_oneof![
        Just(MachineState::Off),
        Just(MachineState::Standby),
        Just(MachineState::Production),
    ]
}

proptest! {
    #[test]
    fn mask_has_one_state_per_sample(values in blocky_values()) {
        let n = values.len();
        let report = analyze(&series(values), &PipelineConfig::default()).unwrap();
        let mask = &report.classification.mask;
        prop_assert_eq!(mask.len(), n);
        for i in 0..n {
            let flags = mask.flags(i).unwrap();
            let set = [flags.is_off, flags.is_standby, flags.is_production]
                .iter()
                .filter(|f| **f)
                .count();
            prop_assert_eq!(set, 1, "sample {} has {} flags", i, set);
        }
        let d = report.classification.distribution;
        prop_assert_eq!(d.off + d.standby + d.production, n);
    }

    #[test]
    fn cycles_are_ordered_and_disjoint(values in blocky_values()) {
        let report = analyze(&series(values), &PipelineConfig::default()).unwrap();
        let cycles = &report.segmentation.cycles;
        for (i, cycle) in cycles.iter().enumerate() {
            prop_assert_eq!(cycle.cycle_id, i);
            prop_assert!(cycle.start_index <= cycle.end_index);
            prop_assert!(cycle.duration_secs > 0.0);
            for idx in cycle.start_index..=cycle.end_index {
                prop_assert!(report.classification.mask.is_production(idx));
            }
        }
        for pair in cycles.windows(2) {
            prop_assert!(pair[0].end_index < pair[1].start_index);
            prop_assert!(pair[0].end_time < pair[1].start_time);
        }
    }

    #[test]
    fn every_production_run_becomes_a_cycle(states in proptest::collection::vec(state_strategy(), 1..200)) {
        let values: Vec<f64> = states
            .iter()
            .map(|s| match s {
                MachineState::Off => 0.0,
                MachineState::Standby => 1.0,
                MachineState::Production => 20.0,
            })
            .collect();
        let mask = StateMask::new(states);
        let runs = mask.runs(MachineState::Production).len();
        let segmenter = CycleSegmenter::new(SegmentationConfig::default()).unwrap();
        let seg = segmenter.segment(&series(values), &mask).unwrap();
        prop_assert_eq!(seg.cycles.len(), runs);
        prop_assert_eq!(seg.statistics.total_cycles, runs);
    }

    #[test]
    fn scores_are_bounded_and_graded_consistently(values in blocky_values()) {
        let report = analyze(&series(values), &PipelineConfig::default()).unwrap();
        for metric in &report.quality.metrics {
            prop_assert!((0.0..=1.0).contains(&metric.quality_score));
            prop_assert_eq!(metric.quality_grade, QualityGrade::from_score(metric.quality_score));
            prop_assert_eq!(metric.is_anomalous, !metric.anomaly_reasons.is_empty());
        }
        let summary = &report.quality.summary;
        prop_assert_eq!(summary.total_cycles, report.segmentation.cycles.len());
        prop_assert_eq!(summary.anomalous_cycle_ids.len(), summary.anomalous_cycles);
        prop_assert_eq!(summary.grade_distribution.values().sum::<usize>(), summary.total_cycles);
    }

    #[test]
    fn scoring_is_idempotent(values in blocky_values()) {
        let report = analyze(&series(values), &PipelineConfig::default()).unwrap();
        let scorer = QualityScorer::new(&Default::default()).unwrap();
        let seg = &report.segmentation;
        let again = scorer.score(&seg.cycles, Some(&seg.statistics)).unwrap();
        prop_assert_eq!(&again, &report.quality);
    }
}
