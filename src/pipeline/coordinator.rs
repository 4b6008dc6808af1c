//! Pipeline Coordinator - holds the validated stages of one configuration
//!
//! Building a coordinator validates every stage up front. A coordinator is
//! immutable after construction, so one instance can analyse any number of
//! series, including from several threads at once.

use std::time::Instant;
use tracing::{debug, info};

use super::{AnalysisReport, PipelineConfig, SeriesProfile};
use crate::error::Result;
use crate::quality::QualityScorer;
use crate::segmentation::CycleSegmenter;
use crate::state::StateClassifier;
use crate::types::Series;

#[derive(Debug, Clone)]
pub struct PipelineCoordinator {
    classifier: StateClassifier,
    segmenter: CycleSegmenter,
    scorer: QualityScorer,
}

impl PipelineCoordinator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            classifier: StateClassifier::new(config.state.clone())?,
            segmenter: CycleSegmenter::new(config.segmentation.clone())?,
            scorer: QualityScorer::new(&config.quality)?,
        })
    }

    pub fn run(&self, series: &Series) -> Result<AnalysisReport> {
        let started = Instant::now();
        let profile = SeriesProfile::of(series);
        debug!(
            samples = profile.sample_count,
            interval_secs = profile.sampling_interval_secs,
            "analysis started"
        );

        // STAGE 1
        let classification = self.classifier.classify(series)?;

        // STAGE 2: statistics come from the cleaned signal when there is one
        let effective = classification.effective_series(series);
        let segmentation = self.segmenter.segment(effective, &classification.mask)?;

        // STAGE 3
        let quality = self
            .scorer
            .score(&segmentation.cycles, Some(&segmentation.statistics))?;

        info!(
            samples = profile.sample_count,
            cycles = segmentation.cycles.len(),
            anomalous = quality.summary.anomalous_cycles,
            average_quality = quality.summary.average_quality_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisReport {
            profile,
            classification,
            segmentation,
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::segmentation::SegmentationConfig;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_invalid_stage_config_fails_before_running() {
        let config = PipelineConfig {
            segmentation: SegmentationConfig {
                min_duration_secs: 100.0,
                max_duration_secs: Some(10.0),
                ..SegmentationConfig::default()
            },
            ..PipelineConfig::default()
        };
        let err = PipelineCoordinator::new(&config).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
    }

    #[test]
    fn test_coordinator_is_reusable() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
        let mut values = vec![0.0; 20];
        values.extend(vec![30.0; 40]);
        values.extend(vec![0.0; 20]);
        let series = Series::from_values(t0, 1.0, values).unwrap();

        let coordinator = PipelineCoordinator::new(&PipelineConfig::default()).unwrap();
        let first = coordinator.run(&series).unwrap();
        let second = coordinator.run(&series).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.segmentation.cycles.len(), 1);
        assert_eq!(first.quality.metrics.len(), 1);
    }
}
