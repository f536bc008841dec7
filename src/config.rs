use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Tunables for one analysis pass. Every field has a default, so a partial
/// JSON document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub smoothing: SmoothingConfig,
    pub peaks: PeakConfig,
    pub clustering: ClusterConfig,
    pub failure_policy: FailurePolicy,
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Resampler/smoother settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Physical distance covered by the Hann window.
    pub window_span: f64,
    /// Sample forced to level 0 after rescaling (launch-level alignment).
    pub reference_index: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_span: 0.5,
            reference_index: 325,
        }
    }
}

/// Peak detector thresholds, applied to the absolute differential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Minimum peak height in level units.
    pub min_height: f64,
    /// Minimum peak width in samples.
    pub min_width: f64,
    /// Minimum separation between accepted peaks in samples.
    pub min_distance: usize,
    /// Height (relative to prominence) at which width is evaluated.
    pub rel_height: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            min_height: 0.00125,
            min_width: 5.0,
            min_distance: 150,
            rel_height: 0.5,
        }
    }
}

/// How candidate features from all traces are merged into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Tolerance buckets filled in trace order; result depends on load order.
    #[default]
    Bucket,
    /// Sort every feature by position, then merge in one left-to-right sweep.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub strategy: ClusterStrategy,
    /// Significant figures kept for positions >= 1.
    pub significant_figures: u32,
    /// Decimal places kept for positions < 1; also the bucket step (10^-n).
    pub decimal_places: u32,
    /// Neighbouring buckets (in steps) that absorb a feature.
    pub neighbour_steps: i64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategy::Bucket,
            significant_figures: 1,
            decimal_places: 1,
            neighbour_steps: 1,
        }
    }
}

/// What a run does when one trace fails to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the trace out and report a per-file warning.
    #[default]
    SkipTrace,
    /// Abort the run; the previous publication stays in place.
    AbortRun,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_detector_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.smoothing.reference_index, 325);
        assert!((cfg.smoothing.window_span - 0.5).abs() < 1e-12);
        assert!((cfg.peaks.min_height - 0.00125).abs() < 1e-12);
        assert_eq!(cfg.peaks.min_distance, 150);
        assert_eq!(cfg.clustering.strategy, ClusterStrategy::Bucket);
        assert_eq!(cfg.failure_policy, FailurePolicy::SkipTrace);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg = PipelineConfig::from_json(
            r#"{ "smoothing": { "reference_index": 10 }, "clustering": { "strategy": "sweep" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.smoothing.reference_index, 10);
        assert!((cfg.smoothing.window_span - 0.5).abs() < 1e-12);
        assert_eq!(cfg.clustering.strategy, ClusterStrategy::Sweep);
        assert_eq!(cfg.clustering.neighbour_steps, 1);
        assert_eq!(cfg.peaks, PeakConfig::default());
    }

    #[test]
    fn test_failure_policy_names() {
        let cfg = PipelineConfig::from_json(r#"{ "failure_policy": "abort_run" }"#).unwrap();
        assert_eq!(cfg.failure_policy, FailurePolicy::AbortRun);
    }
}
