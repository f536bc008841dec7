use crate::config::PeakConfig;
use crate::data::model::{Feature, NormalizedTrace};

// ---------------------------------------------------------------------------
// Differentiator
// ---------------------------------------------------------------------------

/// First-order difference of the level row, same length as the trace.
///
/// Entry `i` is `level[i + 1] - level[i]`; the last two entries are held at
/// zero rather than differenced.
pub fn differentiate(levels: &[f64]) -> Vec<f64> {
    let n = levels.len();
    (0..n)
        .map(|i| {
            if i + 2 < n {
                levels[i + 1] - levels[i]
            } else {
                0.0
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Peak detector
// ---------------------------------------------------------------------------

/// Indices of significant peaks in `signal`, ascending.
///
/// Filters run in this order: local maxima (plateaus resolve to their
/// middle sample), minimum height, minimum separation (taller peaks win),
/// minimum width measured at `rel_height` of each peak's prominence.
pub fn find_peaks(signal: &[f64], cfg: &PeakConfig) -> Vec<usize> {
    let mut peaks = local_maxima(signal);
    peaks.retain(|&p| signal[p] >= cfg.min_height);
    let peaks = select_by_distance(signal, &peaks, cfg.min_distance);

    peaks
        .into_iter()
        .filter(|&p| {
            let (prominence, left_base, right_base) = prominence(signal, p);
            let width = width_at(signal, p, prominence, left_base, right_base, cfg.rel_height);
            width >= cfg.min_width
        })
        .collect()
}

/// Candidate events on one normalized trace.
pub fn detect_features(trace: &NormalizedTrace, cfg: &PeakConfig) -> Vec<Feature> {
    let magnitude: Vec<f64> = differentiate(trace.levels())
        .into_iter()
        .map(f64::abs)
        .collect();

    find_peaks(&magnitude, cfg)
        .into_iter()
        .map(|index| Feature {
            index,
            distance: trace.distances()[index],
            level: trace.levels()[index],
        })
        .collect()
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let i_max = n - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    if min_distance <= 1 {
        return peaks.to_vec();
    }

    let mut by_height: Vec<usize> = (0..peaks.len()).collect();
    by_height.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    let mut keep = vec![true; peaks.len()];
    for &j in by_height.iter().rev() {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= min_distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= min_distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Prominence of the peak at `peak`, with the bases it was measured from.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let apex = x[peak];

    let mut left_min = apex;
    let mut left_base = peak;
    for i in (0..=peak).rev() {
        if x[i] > apex {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_min = apex;
    let mut right_base = peak;
    for (i, &v) in x.iter().enumerate().skip(peak) {
        if v > apex {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (apex - left_min.max(right_min), left_base, right_base)
}

/// Width of a peak, in samples, at `rel_height` below its apex, with linear
/// interpolation between the bracketing samples.
fn width_at(
    x: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> f64 {
    let height = x[peak] - prominence * rel_height;

    let mut i = peak;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if x[i] < height {
        left_ip += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = peak;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if x[i] < height {
        right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    right_ip - left_ip
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth bump of the given half-width centred on `centre`.
    fn bump(signal: &mut [f64], centre: usize, half_width: usize, height: f64) {
        for k in 0..=2 * half_width {
            let t = k as f64 / (2 * half_width) as f64;
            let v = height * (0.5 - 0.5 * (2.0 * std::f64::consts::PI * t).cos());
            signal[centre - half_width + k] += v;
        }
    }

    #[test]
    fn test_differentiate_flattens_last_two_entries() {
        let d = differentiate(&[0.0, 1.0, 3.0, 6.0, 10.0]);
        assert_eq!(d, vec![1.0, 2.0, 3.0, 0.0, 0.0]);
        assert_eq!(differentiate(&[5.0]), vec![0.0]);
        assert!(differentiate(&[]).is_empty());
    }

    #[test]
    fn test_flat_signal_has_no_peaks() {
        let signal = vec![0.0; 1000];
        assert!(find_peaks(&signal, &PeakConfig::default()).is_empty());
    }

    #[test]
    fn test_plateau_resolves_to_middle() {
        let x = [0.0, 1.0, 2.0, 2.0, 2.0, 2.0, 1.0, 0.0];
        assert_eq!(local_maxima(&x), vec![3]);
        // a plateau running into the edge is not a peak
        assert!(local_maxima(&[0.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_low_peaks_are_dropped() {
        let mut signal = vec![0.0; 400];
        bump(&mut signal, 100, 20, 0.001);
        bump(&mut signal, 300, 20, 0.01);
        assert_eq!(find_peaks(&signal, &PeakConfig::default()), vec![300]);
    }

    #[test]
    fn test_taller_peak_suppresses_close_neighbour() {
        let mut signal = vec![0.0; 800];
        bump(&mut signal, 200, 20, 0.01);
        bump(&mut signal, 300, 20, 0.05);
        bump(&mut signal, 600, 20, 0.02);
        assert_eq!(find_peaks(&signal, &PeakConfig::default()), vec![300, 600]);
    }

    #[test]
    fn test_narrow_spikes_fail_width() {
        let mut signal = vec![0.0; 400];
        signal[100] = 0.5;
        bump(&mut signal, 300, 10, 0.5);
        assert_eq!(find_peaks(&signal, &PeakConfig::default()), vec![300]);
    }

    #[test]
    fn test_width_of_triangle() {
        // triangle 0..4..0, half height 2 crosses at 2 and 6
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let (prom, lb, rb) = prominence(&x, 4);
        assert_eq!((prom, lb, rb), (4.0, 0, 8));
        assert!((width_at(&x, 4, prom, lb, rb, 0.5) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_features_carry_distance_and_level() {
        let n = 600;
        let levels: Vec<f64> = (0..n).map(|i| if i < 300 { 0.0 } else { -1.0 }).collect();
        let mut smooth = levels.clone();
        // spread the step over 20 samples so it has width
        for (i, v) in smooth.iter_mut().enumerate().take(310).skip(290) {
            *v = -((i - 290) as f64) / 20.0;
        }
        let distances: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
        let trace = NormalizedTrace::new("1550nm", smooth, distances, 10).unwrap();
        let features = detect_features(&trace, &PeakConfig::default());
        assert_eq!(features.len(), 1);
        let f = features[0];
        assert!((290..310).contains(&f.index));
        assert_eq!(f.distance, f.index as f64 * 0.5);
        assert_eq!(f.level, trace.levels()[f.index]);
    }
}
