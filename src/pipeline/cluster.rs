use std::collections::BTreeMap;

use crate::config::{ClusterConfig, ClusterStrategy};
use crate::data::model::{Contribution, Event, Feature};

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to `significant_figures` significant figures; values below 1 are
/// rounded to one decimal place instead.
///
/// `round_sig(1234.0, 2) == 1200.0`, `round_sig(0.04, 1) == 0.0`.
pub fn round_sig(value: f64, significant_figures: u32) -> f64 {
    round_position(value, significant_figures, 1)
}

/// Canonical event position: `significant_figures` significant figures at or
/// above 1, `decimal_places` decimals below it.
pub fn round_position(value: f64, significant_figures: u32, decimal_places: u32) -> f64 {
    if value < 1.0 {
        return round_to(value, decimal_places as i32);
    }
    let magnitude = value.log10().floor() as i32;
    round_to(value, significant_figures as i32 - 1 - magnitude)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-decimals);
        (value / factor).round() * factor
    }
}

// ---------------------------------------------------------------------------
// Bucket merge
// ---------------------------------------------------------------------------

/// Events keyed by canonical position, filled one feature at a time.
///
/// Positions are keyed in whole steps of `10^-decimal_places` so neighbour
/// lookups compare integers. A feature joins the bucket at its own key,
/// otherwise the nearest existing neighbour within `neighbour_steps` (lower
/// side first), otherwise opens a new bucket. The outcome depends on the
/// order features are absorbed in.
#[derive(Debug, Clone)]
pub struct EventBuckets {
    scale: f64,
    neighbour_steps: i64,
    buckets: BTreeMap<i64, Event>,
}

impl EventBuckets {
    pub fn new(cfg: &ClusterConfig) -> Self {
        EventBuckets {
            scale: 10f64.powi(cfg.decimal_places as i32),
            neighbour_steps: cfg.neighbour_steps.max(0),
            buckets: BTreeMap::new(),
        }
    }

    fn key(&self, position: f64) -> i64 {
        (position * self.scale).round() as i64
    }

    /// Absorb one contribution at an already canonical position.
    pub fn absorb(&mut self, position: f64, contribution: Contribution) {
        let key = self.key(position);
        let target = std::iter::once(key)
            .chain((1..=self.neighbour_steps).flat_map(|s| [key - s, key + s]))
            .find(|k| self.buckets.contains_key(k))
            .unwrap_or(key);

        self.buckets
            .entry(target)
            .or_insert_with(|| Event {
                position,
                contributions: Vec::new(),
            })
            .contributions
            .push(contribution);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Events in ascending position order.
    pub fn into_events(self) -> Vec<Event> {
        self.buckets.into_values().collect()
    }
}

// ---------------------------------------------------------------------------
// Clustering entry point
// ---------------------------------------------------------------------------

/// Merge per-trace feature lists into events, ascending by position.
///
/// `features[t]` holds the features found on trace `t`.
pub fn cluster(features: &[Vec<Feature>], cfg: &ClusterConfig) -> Vec<Event> {
    let events = match cfg.strategy {
        ClusterStrategy::Bucket => bucket_merge(features, cfg),
        ClusterStrategy::Sweep => sweep_merge(features, cfg),
    };
    log::debug!(
        "clustered {} features into {} events ({:?})",
        features.iter().map(Vec::len).sum::<usize>(),
        events.len(),
        cfg.strategy
    );
    events
}

fn canonical(feature: &Feature, cfg: &ClusterConfig) -> f64 {
    round_position(feature.distance, cfg.significant_figures, cfg.decimal_places)
}

fn bucket_merge(features: &[Vec<Feature>], cfg: &ClusterConfig) -> Vec<Event> {
    let mut buckets = EventBuckets::new(cfg);
    for (trace, trace_features) in features.iter().enumerate() {
        for f in trace_features {
            buckets.absorb(
                canonical(f, cfg),
                Contribution {
                    trace,
                    index: f.index,
                },
            );
        }
    }
    buckets.into_events()
}

/// Order-independent alternative: sort every feature by canonical position
/// and open a new event whenever a feature lies more than `neighbour_steps`
/// past the first feature of the current event.
fn sweep_merge(features: &[Vec<Feature>], cfg: &ClusterConfig) -> Vec<Event> {
    let scale = 10f64.powi(cfg.decimal_places as i32);
    let mut all: Vec<(i64, f64, Contribution)> = features
        .iter()
        .enumerate()
        .flat_map(|(trace, fs)| {
            fs.iter().map(move |f| {
                let position = canonical(f, cfg);
                let key = (position * scale).round() as i64;
                (key, position, Contribution { trace, index: f.index })
            })
        })
        .collect();
    all.sort_by_key(|&(key, _, c)| (key, c.trace, c.index));

    let mut events: Vec<Event> = Vec::new();
    let mut anchor = None;
    for (key, position, contribution) in all {
        match (anchor, events.last_mut()) {
            (Some(a), Some(current)) if key - a <= cfg.neighbour_steps => {
                current.contributions.push(contribution);
            }
            _ => {
                anchor = Some(key);
                events.push(Event {
                    position,
                    contributions: vec![contribution],
                });
            }
        }
    }
    events
}
