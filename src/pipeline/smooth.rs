use crate::config::SmoothingConfig;
use crate::data::model::{NormalizedTrace, RawTrace};
use crate::error::{OtdrError, Result};

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Smoothing window length in samples: `window_span` physical units worth of
/// raw samples, at least 1.
pub fn window_len(sample_spacing: f64, window_span: f64) -> usize {
    ((window_span / sample_spacing).round() as usize).max(1)
}

/// Hann window of `len` points, scaled so the weights sum to 1.
pub fn hann_window(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = (len - 1) as f64;
    let raw: Vec<f64> = (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / denom).cos())
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

// ---------------------------------------------------------------------------
// Low-pass filter
// ---------------------------------------------------------------------------

/// Hann low-pass over a level row.
///
/// The row is mirror-padded (edge sample excluded) by `window_len - 1` on
/// both sides and convolved in "valid" mode; the result is cut back to the
/// input length. Output `k` weights inputs `k - window_len + 1 ..= k`.
pub fn low_pass(levels: &[f64], window_len: usize) -> Result<Vec<f64>> {
    let n = levels.len();
    if window_len == 0 || n < window_len {
        return Err(OtdrError::InsufficientSamples {
            samples: n,
            window_len,
        });
    }

    let pad = window_len - 1;
    let mut padded = Vec::with_capacity(n + 2 * pad);
    padded.extend(levels[1..=pad].iter().rev());
    padded.extend_from_slice(levels);
    padded.extend(levels[n - 1 - pad..n - 1].iter().rev());

    let window = hann_window(window_len);
    let smoothed: Vec<f64> = (0..n)
        .map(|k| {
            window
                .iter()
                .enumerate()
                .map(|(j, w)| w * padded[k + pad - j])
                .sum::<f64>()
        })
        .collect();
    Ok(smoothed)
}

// ---------------------------------------------------------------------------
// Rescaling
// ---------------------------------------------------------------------------

/// Linear-interpolation zoom of one row by `factor`.
///
/// The output has `round(len * factor)` samples (ties to even) and its end
/// points coincide with the input's.
pub fn zoom_linear(row: &[f64], factor: f64) -> Vec<f64> {
    let n = row.len();
    let m = (n as f64 * factor).round_ties_even().max(0.0) as usize;
    if n == 0 || m == 0 {
        return Vec::new();
    }
    if n == 1 || m == 1 {
        return vec![row[0]; m];
    }

    let last = n - 1;
    (0..m)
        .map(|j| {
            let coord = j as f64 * last as f64 / (m - 1) as f64;
            let i0 = (coord.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            let frac = coord - i0 as f64;
            row[i0] * (1.0 - frac) + row[i1] * frac
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Smooth, rescale and launch-align one raw trace.
pub fn normalize(trace: &RawTrace, cfg: &SmoothingConfig) -> Result<NormalizedTrace> {
    let window_len = window_len(trace.sample_spacing(), cfg.window_span);
    let smoothed = low_pass(trace.levels(), window_len)?;
    let trim = smoothed.len().min(trace.distances().len());

    let mut levels = zoom_linear(&smoothed[..trim], trace.resolution());
    let distances = zoom_linear(&trace.distances()[..trim], trace.resolution());

    let offset = *levels
        .get(cfg.reference_index)
        .ok_or(OtdrError::ReferenceIndexOutOfRange {
            index: cfg.reference_index,
            len: levels.len(),
        })?;
    for level in &mut levels {
        *level -= offset;
    }

    log::debug!(
        "normalized {} trace: {} raw -> {} samples, window {}",
        trace.wavelength(),
        trace.len(),
        levels.len(),
        window_len
    );
    NormalizedTrace::new(trace.wavelength(), levels, distances, window_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TraceMeta;

    fn raw(n: usize, spacing: &str, resolution: f64) -> RawTrace {
        let distances = (0..n).map(|i| i as f64 * 0.01).collect();
        let levels = (0..n).map(|i| -0.002 * i as f64 + (i % 7) as f64 * 0.01).collect();
        RawTrace::new(TraceMeta::new("1550nm", spacing, resolution), distances, levels).unwrap()
    }

    #[test]
    fn test_window_len_spans_half_unit() {
        assert_eq!(window_len(0.01, 0.5), 50);
        assert_eq!(window_len(0.02, 0.5), 25);
        assert_eq!(window_len(0.3, 0.5), 2);
        assert_eq!(window_len(10.0, 0.5), 1);
    }

    #[test]
    fn test_hann_window_is_normalized_and_symmetric() {
        let w = hann_window(5);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(w[0], 0.0);
        assert!((w[1] - w[3]).abs() < 1e-12);
        // 0, 0.5, 1, 0.5, 0 scaled by 1/2
        assert!((w[2] - 0.5).abs() < 1e-12);
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_low_pass_keeps_constant_rows() {
        let levels = vec![-4.0; 20];
        let out = low_pass(&levels, 6).unwrap();
        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|v| (v + 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_low_pass_mirrors_leading_edge() {
        // window 3 -> weights [0, 1, 0]: output k is input k - 1, and the
        // first output is the mirrored sample levels[1].
        let levels = [1.0, 2.0, 3.0, 4.0];
        let out = low_pass(&levels, 3).unwrap();
        let expected = [2.0, 1.0, 2.0, 3.0];
        for (o, e) in out.iter().zip(expected) {
            assert!((o - e).abs() < 1e-12, "{out:?}");
        }
    }

    #[test]
    fn test_low_pass_rejects_short_rows() {
        let err = low_pass(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(
            err,
            OtdrError::InsufficientSamples {
                samples: 2,
                window_len: 3
            }
        ));
    }

    #[test]
    fn test_zoom_doubles_with_linear_interpolation() {
        let out = zoom_linear(&[0.0, 3.0, 6.0], 2.0);
        let expected = [0.0, 1.2, 2.4, 3.6, 4.8, 6.0];
        assert_eq!(out.len(), expected.len());
        for (o, e) in out.iter().zip(expected) {
            assert!((o - e).abs() < 1e-12, "{out:?}");
        }

        let out = zoom_linear(&[0.0, 10.0, 0.0, 10.0], 2.0);
        assert_eq!(out.len(), 8);
        // sample j sits at input coordinate 3j/7
        assert!((out[1] - 30.0 / 7.0).abs() < 1e-12);
        assert!((out[3] - 50.0 / 7.0).abs() < 1e-12);
        assert!((out[7] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_identity_at_unit_factor() {
        let row = [1.0, -2.0, 5.5];
        assert_eq!(zoom_linear(&row, 1.0), row.to_vec());
    }

    #[test]
    fn test_normalize_aligns_reference_sample() {
        let trace = normalize(&raw(600, "0.01 km", 1.0), &SmoothingConfig::default()).unwrap();
        assert_eq!(trace.len(), 600);
        assert_eq!(trace.levels().len(), trace.distances().len());
        assert!(trace.levels()[325].abs() < 1e-12);
        assert_eq!(trace.window_len(), 50);
    }

    #[test]
    fn test_normalize_rescales_by_resolution() {
        let source = raw(400, "0.01 km", 2.0);
        let trace = normalize(&source, &SmoothingConfig::default()).unwrap();
        assert_eq!(trace.len(), 800);
        assert_eq!(trace.distances().len(), 800);
        assert!((trace.distances()[799] - 3.99).abs() < 1e-12);
        // coordinate 399/799 * 1 lies between raw samples 0 and 1
        let expected = 0.01 * 399.0 / 799.0;
        assert!((trace.distances()[1] - expected).abs() < 1e-12);
        assert!(trace.distances().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_normalize_short_trace_fails_reference_index() {
        let err = normalize(&raw(200, "0.01 km", 1.0), &SmoothingConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            OtdrError::ReferenceIndexOutOfRange { index: 325, len: 200 }
        ));
    }

    #[test]
    fn test_normalize_reference_index_is_configurable() {
        let cfg = SmoothingConfig {
            reference_index: 10,
            ..SmoothingConfig::default()
        };
        let trace = normalize(&raw(200, "0.01 km", 1.0), &cfg).unwrap();
        assert!(trace.levels()[10].abs() < 1e-12);
    }

    #[test]
    fn test_normalize_rejects_trace_shorter_than_window() {
        let err = normalize(&raw(30, "0.01 km", 1.0), &SmoothingConfig::default()).unwrap_err();
        assert!(matches!(err, OtdrError::InsufficientSamples { samples: 30, .. }));
    }
}
