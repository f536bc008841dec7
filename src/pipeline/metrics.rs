use crate::data::model::{Event, EventMetrics, NormalizedTrace};

/// Loss and dispersion factor of one event.
///
/// Every trace is sampled at every contributing index: one smoothing window
/// (that trace's own) before the index for the start level and one window
/// after it for the end level, both clamped to the trace.
///
/// # Panics
/// If the event has no contributors or there are no non-empty traces; the
/// clusterer never produces either.
pub fn event_metrics(event: &Event, traces: &[NormalizedTrace]) -> EventMetrics {
    assert!(
        !event.contributions.is_empty(),
        "event at {} has no contributing features",
        event.position
    );

    let mut start_values = Vec::new();
    let mut end_values = Vec::new();
    let mut spans = Vec::new();

    for trace in traces {
        let Some(last) = trace.len().checked_sub(1) else {
            continue;
        };
        let w = trace.window_len();
        for index in event.indices() {
            let start = index.saturating_sub(w).min(last);
            let end = (index + w).min(last);
            start_values.push(trace.levels()[start]);
            end_values.push(trace.levels()[end]);
            spans.push((trace.distances()[start], trace.distances()[end]));
        }
    }
    assert!(
        !start_values.is_empty(),
        "event at {} sampled no trace levels",
        event.position
    );

    EventMetrics {
        loss: mean(&start_values) - mean(&end_values),
        dispersion_factor: dispersion_factor(spread(&start_values), spread(&end_values)),
        spans,
    }
}

/// `round(max(a / b, b / a))` for two spreads; 1 when they are equal (both
/// zero included) and infinite when exactly one is zero.
pub fn dispersion_factor(start_spread: f64, end_spread: f64) -> f64 {
    if start_spread == end_spread {
        return 1.0;
    }
    let (hi, lo) = if start_spread > end_spread {
        (start_spread, end_spread)
    } else {
        (end_spread, start_spread)
    };
    if lo == 0.0 {
        return f64::INFINITY;
    }
    (hi / lo).round()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn spread(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Contribution;

    fn step_trace(levels_before: f64, levels_after: f64, at: usize, window: usize) -> NormalizedTrace {
        let levels: Vec<f64> = (0..200)
            .map(|i| if i < at { levels_before } else { levels_after })
            .collect();
        let distances: Vec<f64> = (0..200).map(|i| i as f64 * 0.1).collect();
        NormalizedTrace::new("1550nm", levels, distances, window).unwrap()
    }

    fn event_at(indices: &[usize]) -> Event {
        Event {
            position: 10.0,
            contributions: indices
                .iter()
                .map(|&index| Contribution { trace: 0, index })
                .collect(),
        }
    }

    #[test]
    fn test_loss_of_agreeing_traces() {
        let traces = vec![step_trace(0.0, -2.0, 100, 10), step_trace(0.0, -2.0, 100, 10)];
        let m = event_metrics(&event_at(&[100]), &traces);
        assert!((m.loss - 2.0).abs() < 1e-12);
        assert_eq!(m.dispersion_factor, 1.0);
        assert_eq!(m.spans.len(), 2);
        assert!((m.spans[0].0 - 9.0).abs() < 1e-12);
        assert!((m.spans[0].1 - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_dispersion_flags_wavelength_dependence() {
        // start spread 1, end spread 4
        let traces = vec![step_trace(0.0, -1.0, 100, 10), step_trace(1.0, -5.0, 100, 10)];
        let m = event_metrics(&event_at(&[100]), &traces);
        assert!((m.loss - (0.5 + 3.0)).abs() < 1e-12);
        assert_eq!(m.dispersion_factor, 4.0);
    }

    #[test]
    fn test_windows_clamp_to_trace_edges() {
        let traces = vec![step_trace(0.0, -1.0, 3, 10)];
        let m = event_metrics(&event_at(&[3, 195]), &traces);
        assert_eq!(m.spans[0].0, 0.0);
        assert!((m.spans[1].1 - 19.9).abs() < 1e-12);
    }

    #[test]
    fn test_dispersion_factor_cases() {
        assert_eq!(dispersion_factor(0.0, 0.0), 1.0);
        assert_eq!(dispersion_factor(2.0, 0.5), 4.0);
        assert_eq!(dispersion_factor(0.5, 0.8), 2.0);
        assert_eq!(dispersion_factor(0.0, 0.3), f64::INFINITY);
    }

    #[test]
    #[should_panic(expected = "no contributing features")]
    fn test_empty_event_is_invariant_violation() {
        let traces = vec![step_trace(0.0, -1.0, 100, 10)];
        event_metrics(&event_at(&[]), &traces);
    }
}
