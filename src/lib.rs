//! OTDR trace normalization and event detection.
//!
//! Raw traces from the trace parser are smoothed onto a common distance
//! grid, differentiated, scanned for significant steps, merged across
//! wavelengths into physical events and scored for loss and cross-trace
//! consistency. [`state::Orchestrator`] sequences full recomputes and
//! publishes the result for presentation.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod state;

pub use config::PipelineConfig;
pub use data::model::{Event, EventMetrics, EventRow, Feature, NormalizedTrace, RawTrace, TraceMeta};
pub use error::{OtdrError, Result};
pub use pipeline::{analyze, Analysis};
pub use state::{Orchestrator, RunState, TriggerOutcome};
