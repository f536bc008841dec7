use serde::{Deserialize, Serialize};

use super::loader::parse_quantity;
use crate::error::{OtdrError, Result};

// ---------------------------------------------------------------------------
// TraceMeta – metadata handed over by the trace parser
// ---------------------------------------------------------------------------

/// Metadata of one trace file, kept in the parser's own nesting so project
/// files written by other tools load unchanged. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMeta {
    #[serde(rename = "GenParams")]
    pub general: GeneralParams,
    #[serde(rename = "FxdParams")]
    pub fixed: FixedParams,
    /// Where the trace was loaded from, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralParams {
    /// Wavelength label with unit suffix, e.g. `"1550nm"`.
    pub wavelength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedParams {
    /// Distance per raw sample with unit suffix, e.g. `"0.01 km"`.
    #[serde(rename = "sample spacing")]
    pub sample_spacing: String,
    /// Distance-resolution factor used to rescale onto the canonical grid.
    pub resolution: f64,
}

impl TraceMeta {
    pub fn new(wavelength: &str, sample_spacing: &str, resolution: f64) -> Self {
        TraceMeta {
            general: GeneralParams {
                wavelength: wavelength.to_string(),
            },
            fixed: FixedParams {
                sample_spacing: sample_spacing.to_string(),
                resolution,
            },
            url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawTrace – one captured trace, as parsed
// ---------------------------------------------------------------------------

/// A trace exactly as captured: metadata plus index-aligned distance and
/// level rows. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    meta: TraceMeta,
    sample_spacing: f64,
    resolution: f64,
    distances: Vec<f64>,
    levels: Vec<f64>,
}

impl RawTrace {
    /// Build a trace from parsed rows, validating the numeric metadata.
    pub fn new(meta: TraceMeta, distances: Vec<f64>, levels: Vec<f64>) -> Result<Self> {
        let sample_spacing = parse_quantity(&meta.fixed.sample_spacing).ok_or_else(|| {
            OtdrError::InvalidMetadata(format!(
                "sample spacing {:?} is not numeric",
                meta.fixed.sample_spacing
            ))
        })?;
        if !(sample_spacing.is_finite() && sample_spacing > 0.0) {
            return Err(OtdrError::InvalidMetadata(format!(
                "sample spacing must be positive, got {sample_spacing}"
            )));
        }
        let resolution = meta.fixed.resolution;
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(OtdrError::InvalidMetadata(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        if distances.len() != levels.len() {
            return Err(OtdrError::LengthMismatch {
                levels: levels.len(),
                distances: distances.len(),
            });
        }
        Ok(RawTrace {
            meta,
            sample_spacing,
            resolution,
            distances,
            levels,
        })
    }

    pub fn meta(&self) -> &TraceMeta {
        &self.meta
    }

    pub fn wavelength(&self) -> &str {
        &self.meta.general.wavelength
    }

    pub fn sample_spacing(&self) -> f64 {
        self.sample_spacing
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ---------------------------------------------------------------------------
// NormalizedTrace – smoothed, rescaled, launch-aligned
// ---------------------------------------------------------------------------

/// A trace on the canonical distance grid.
///
/// Invariants checked on construction: both rows have the same length, every
/// value is finite and distances never decrease. Never mutated afterwards;
/// a recompute builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrace {
    wavelength: String,
    levels: Vec<f64>,
    distances: Vec<f64>,
    /// Smoothing window (samples) this trace was built with.
    window_len: usize,
}

impl NormalizedTrace {
    pub fn new(
        wavelength: &str,
        levels: Vec<f64>,
        distances: Vec<f64>,
        window_len: usize,
    ) -> Result<Self> {
        if levels.len() != distances.len() {
            return Err(OtdrError::LengthMismatch {
                levels: levels.len(),
                distances: distances.len(),
            });
        }
        if let Some(index) = levels
            .iter()
            .zip(&distances)
            .position(|(l, d)| !l.is_finite() || !d.is_finite())
        {
            return Err(OtdrError::NonFiniteSample { index });
        }
        if let Some(index) = distances.windows(2).position(|w| w[1] < w[0]) {
            return Err(OtdrError::UnorderedDistances { index: index + 1 });
        }
        Ok(NormalizedTrace {
            wavelength: wavelength.to_string(),
            levels,
            distances,
            window_len,
        })
    }

    pub fn wavelength(&self) -> &str {
        &self.wavelength
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Every `step`-th `(distance, level)` point, for charting.
    pub fn decimated(&self, step: usize) -> Vec<(f64, f64)> {
        self.distances
            .iter()
            .zip(&self.levels)
            .step_by(step.max(1))
            .map(|(&d, &l)| (d, l))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Feature / Event – detections
// ---------------------------------------------------------------------------

/// A candidate event on one normalized trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    /// Sample index into the trace the feature was found on.
    pub index: usize,
    pub distance: f64,
    pub level: f64,
}

/// One sample index absorbed into an event, and the trace it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub trace: usize,
    pub index: usize,
}

/// A physical event merged across traces.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Canonical (rounded) position.
    pub position: f64,
    /// Absorbed features in absorption order.
    pub contributions: Vec<Contribution>,
}

impl Event {
    /// All absorbed sample indices, in absorption order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.contributions.iter().map(|c| c.index)
    }

    /// Sample indices a given trace contributed. Empty when the trace had no
    /// feature near this position.
    pub fn indices_for(&self, trace: usize) -> Vec<usize> {
        self.contributions
            .iter()
            .filter(|c| c.trace == trace)
            .map(|c| c.index)
            .collect()
    }
}

/// Loss and cross-trace consistency of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetrics {
    /// Mean level before the event minus mean level after it.
    pub loss: f64,
    /// Ratio of start/end spreads, rounded; 1 means all traces agree.
    pub dispersion_factor: f64,
    /// `(start, end)` distances of every sampled window.
    pub spans: Vec<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// Presentation rows
// ---------------------------------------------------------------------------

/// An event with its metrics and the user's event-type label.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedEvent {
    pub label: String,
    pub event: Event,
    pub metrics: EventMetrics,
}

/// One row of the event table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    #[serde(rename = "Event")]
    pub label: String,
    #[serde(rename = "Distance")]
    pub distance: f64,
    #[serde(rename = "Loss")]
    pub loss: f64,
    #[serde(rename = "Dispersion factor")]
    pub dispersion_factor: f64,
}

impl From<&AnalyzedEvent> for EventRow {
    fn from(ev: &AnalyzedEvent) -> Self {
        EventRow {
            label: ev.label.clone(),
            distance: ev.event.position,
            loss: ev.metrics.loss,
            dispersion_factor: ev.metrics.dispersion_factor,
        }
    }
}
