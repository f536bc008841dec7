use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value as JsonValue;

use crate::config::PipelineConfig;
use crate::data::model::RawTrace;
use crate::data::project::Project;
use crate::error::Result;
use crate::pipeline::{analyze, Analysis};

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// What happened to a trigger.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// The run completed and this analysis is now published.
    Published(Arc<Analysis>),
    /// A run was already in progress; the trigger had no effect.
    Dropped,
}

impl TriggerOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, TriggerOutcome::Dropped)
    }
}

/// A loaded trace and the name it is shown under.
#[derive(Debug, Clone)]
pub struct LoadedTrace {
    pub name: String,
    pub trace: Arc<RawTrace>,
}

/// Puts the orchestrator back to Idle when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns the loaded trace set and the latest published analysis.
///
/// Every trigger (add, remove, recompute, project load) tries to move the
/// orchestrator from Idle to Running with a single atomic swap. If a run is
/// already in progress the trigger is dropped, trace mutation included; it
/// is never queued. Each run is a full recompute over all loaded traces. A
/// failed run leaves the previous analysis published.
pub struct Orchestrator {
    config: PipelineConfig,
    running: AtomicBool,
    project_meta: RwLock<JsonValue>,
    traces: RwLock<Vec<LoadedTrace>>,
    published: RwLock<Arc<Analysis>>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Orchestrator {
            config,
            running: AtomicBool::new(false),
            project_meta: RwLock::new(JsonValue::Null),
            traces: RwLock::new(Vec::new()),
            published: RwLock::new(Arc::new(Analysis::default())),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// The most recently published analysis.
    pub fn published(&self) -> Arc<Analysis> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the loaded traces, in load order.
    pub fn traces(&self) -> Vec<LoadedTrace> {
        self.traces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // -- Triggers --

    /// Append traces and recompute.
    pub fn add_traces<I>(&self, traces: I) -> Result<TriggerOutcome>
    where
        I: IntoIterator<Item = (String, RawTrace)>,
    {
        self.trigger("add traces", |loaded| {
            loaded.extend(traces.into_iter().map(|(name, trace)| LoadedTrace {
                name,
                trace: Arc::new(trace),
            }));
        })
    }

    /// Remove the traces at the given load-order positions and recompute.
    /// Out-of-range positions are ignored.
    pub fn remove_traces(&self, positions: &[usize]) -> Result<TriggerOutcome> {
        self.trigger("remove traces", |loaded| {
            let mut i = 0;
            loaded.retain(|_| {
                let keep = !positions.contains(&i);
                i += 1;
                keep
            });
        })
    }

    /// Recompute over the unchanged trace set.
    pub fn recompute(&self) -> Result<TriggerOutcome> {
        self.trigger("recompute", |_| {})
    }

    /// Replace the trace set with a project's traces and recompute.
    pub fn load_project(&self, project: &Project) -> Result<TriggerOutcome> {
        let traces = project.raw_traces()?;
        let meta = project.meta.clone();
        self.trigger("load project", |loaded| {
            *self
                .project_meta
                .write()
                .unwrap_or_else(PoisonError::into_inner) = meta;
            *loaded = traces
                .into_iter()
                .map(|(name, trace)| LoadedTrace {
                    name,
                    trace: Arc::new(trace),
                })
                .collect();
        })
    }

    /// The loaded traces in project-file shape, for saving.
    pub fn to_project(&self) -> Project {
        let meta = self
            .project_meta
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let traces = self.traces();
        Project::from_traces(meta, traces.iter().map(|t| (t.name.as_str(), t.trace.as_ref())))
    }

    /// Set the event-type label of the published event at `position`.
    /// Returns false when no published event sits there. Labels live only
    /// until the next run.
    pub fn set_event_label(&self, position: f64, label: &str) -> bool {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(i) = published
            .events
            .iter()
            .position(|e| e.event.position == position)
        else {
            return false;
        };
        Arc::make_mut(&mut published).events[i].label = label.to_string();
        true
    }

    // -- Run --

    fn trigger<F>(&self, what: &str, mutate: F) -> Result<TriggerOutcome>
    where
        F: FnOnce(&mut Vec<LoadedTrace>),
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("{what}: run in progress, trigger dropped");
            return Ok(TriggerOutcome::Dropped);
        }
        let _guard = RunGuard(&self.running);

        let snapshot = {
            let mut loaded = self.traces.write().unwrap_or_else(PoisonError::into_inner);
            mutate(&mut loaded);
            loaded.clone()
        };
        log::debug!("{what}: running over {} traces", snapshot.len());

        let analysis = Arc::new(analyze(
            snapshot.iter().map(|t| (t.name.as_str(), t.trace.as_ref())),
            &self.config,
        )?);
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = analysis.clone();
        Ok(TriggerOutcome::Published(analysis))
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
