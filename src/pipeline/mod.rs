/// Event-detection pipeline: one full, synchronous pass over a trace set.
///
/// ```text
///   RawTrace (per file)
///        │
///        ▼
///   ┌──────────┐
///   │  smooth   │  Hann low-pass, rescale, launch-align → NormalizedTrace
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  peaks    │  |Δlevel| → significant peaks → Feature list
///   └──────────┘
///        │  (fan-in over all traces)
///        ▼
///   ┌──────────┐
///   │  cluster  │  merge features by canonical position → Event set
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  metrics  │  loss + dispersion factor per Event
///   └──────────┘
/// ```

pub mod cluster;
pub mod metrics;
pub mod peaks;
pub mod smooth;

use palette::Srgb;

use crate::color::wavelength_color;
use crate::config::{FailurePolicy, PipelineConfig};
use crate::data::model::{AnalyzedEvent, EventRow, NormalizedTrace, RawTrace};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Analysis – what a run publishes
// ---------------------------------------------------------------------------

/// A normalized trace ready for charting.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    /// Source file name.
    pub name: String,
    pub color: Srgb<u8>,
    pub trace: NormalizedTrace,
}

/// A trace left out of a run, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceWarning {
    pub name: String,
    pub message: String,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    pub series: Vec<PlotSeries>,
    /// Events in ascending distance order.
    pub events: Vec<AnalyzedEvent>,
    pub warnings: Vec<TraceWarning>,
}

impl Analysis {
    /// Event table rows, ascending by distance.
    pub fn rows(&self) -> Vec<EventRow> {
        let mut rows: Vec<EventRow> = self.events.iter().map(EventRow::from).collect();
        rows.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        rows
    }
}

// ---------------------------------------------------------------------------
// Full pass
// ---------------------------------------------------------------------------

/// Run normalization, detection, clustering and metrics over `traces`.
///
/// Zero traces is not an error and yields an empty analysis. A trace that
/// fails to normalize is skipped with a warning or aborts the pass,
/// depending on `cfg.failure_policy`.
pub fn analyze<'a, I>(traces: I, cfg: &PipelineConfig) -> Result<Analysis>
where
    I: IntoIterator<Item = (&'a str, &'a RawTrace)>,
{
    let mut series = Vec::new();
    let mut warnings = Vec::new();

    for (name, raw) in traces {
        match smooth::normalize(raw, &cfg.smoothing) {
            Ok(trace) => series.push(PlotSeries {
                name: name.to_string(),
                color: wavelength_color(raw.wavelength()),
                trace,
            }),
            Err(e) if cfg.failure_policy == FailurePolicy::SkipTrace => {
                log::warn!("skipping trace {name}: {e}");
                warnings.push(TraceWarning {
                    name: name.to_string(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                log::error!("trace {name} failed, aborting run: {e}");
                return Err(e);
            }
        }
    }

    let features: Vec<_> = series
        .iter()
        .map(|s| peaks::detect_features(&s.trace, &cfg.peaks))
        .collect();
    for (s, f) in series.iter().zip(&features) {
        log::debug!("{} ({}): {} candidate features", s.name, s.trace.wavelength(), f.len());
    }

    let normalized: Vec<NormalizedTrace> = series.iter().map(|s| s.trace.clone()).collect();
    let events = cluster::cluster(&features, &cfg.clustering)
        .into_iter()
        .map(|event| AnalyzedEvent {
            label: String::new(),
            metrics: metrics::event_metrics(&event, &normalized),
            event,
        })
        .collect::<Vec<_>>();

    log::info!(
        "analysed {} traces ({} skipped): {} events",
        series.len(),
        warnings.len(),
        events.len()
    );
    Ok(Analysis {
        series,
        events,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TraceMeta;

    fn raw(n: usize) -> RawTrace {
        let distances = (0..n).map(|i| i as f64 * 0.01).collect();
        RawTrace::new(TraceMeta::new("1310nm", "0.01 km", 1.0), distances, vec![-1.0; n]).unwrap()
    }

    #[test]
    fn test_empty_trace_set_is_empty_analysis() {
        let analysis = analyze(std::iter::empty(), &PipelineConfig::default()).unwrap();
        assert_eq!(analysis, Analysis::default());
    }

    #[test]
    fn test_flat_traces_have_no_events() {
        let a = raw(1000);
        let b = raw(1000);
        let analysis =
            analyze([("a.sor", &a), ("b.sor", &b)], &PipelineConfig::default()).unwrap();
        assert_eq!(analysis.series.len(), 2);
        assert!(analysis.events.is_empty());
        assert!(analysis.rows().is_empty());
    }

    #[test]
    fn test_short_trace_is_skipped_with_warning() {
        let good = raw(1000);
        let short = raw(100);
        let analysis =
            analyze([("good", &good), ("short", &short)], &PipelineConfig::default()).unwrap();
        assert_eq!(analysis.series.len(), 1);
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(analysis.warnings[0].name, "short");
    }

    #[test]
    fn test_short_trace_aborts_when_configured() {
        let short = raw(100);
        let cfg = PipelineConfig {
            failure_policy: FailurePolicy::AbortRun,
            ..PipelineConfig::default()
        };
        assert!(analyze([("short", &short)], &cfg).is_err());
    }
}
