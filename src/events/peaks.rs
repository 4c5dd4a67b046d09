//! Peak-finding primitives over a sampled 1-D signal.

/// Indices of local maxima. A flat top counts once, at its middle sample
/// (rounded down); samples at either end of the signal never qualify.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
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

/// Drop peaks closer than `distance` samples to a higher one.
///
/// Peaks are visited from highest to lowest; each survivor suppresses every
/// neighbour within `distance`. Between equal heights the later peak wins.
pub fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 {
        return peaks.to_vec();
    }
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
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

/// Topological prominence of the peak at `peak`: its height above the
/// higher of the two lowest points reached before climbing to something
/// taller (or hitting the signal's edge) on either side.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];
    let left_base = x[..=peak]
        .iter()
        .rev()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    let right_base = x[peak..]
        .iter()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    height - left_base.max(right_base)
}

/// Population mean and standard deviation.
pub fn mean_std(x: &[f64]) -> (f64, f64) {
    if x.is_empty() {
        return (0.0, 0.0);
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_strict_and_flat_maxima() {
        let x = [0.0, 1.0, 0.0, 2.0, 2.0, 2.0, 0.0, 3.0];
        assert_eq!(local_maxima(&x), vec![1, 4]);
    }

    #[test]
    fn flat_signal_has_no_maxima() {
        assert!(local_maxima(&[0.5; 10]).is_empty());
        assert!(local_maxima(&[0.0, 1.0]).is_empty());
    }

    #[test]
    fn shoulder_is_not_a_peak() {
        let x = [0.0, 1.0, 1.0, 2.0, 0.0];
        assert_eq!(local_maxima(&x), vec![3]);
    }

    #[test]
    fn distance_keeps_the_higher_peak() {
        let mut x = vec![0.0; 50];
        x[10] = 0.5;
        x[15] = 0.9;
        x[40] = 0.4;
        let peaks = local_maxima(&x);
        assert_eq!(select_by_distance(&x, &peaks, 10), vec![15, 40]);
        assert_eq!(select_by_distance(&x, &peaks, 30), vec![15]);
    }

    #[test]
    fn prominence_measures_drop_to_higher_neighbour() {
        let x = [0.0, 1.0, 0.4, 0.8, 0.6, 2.0, 0.0];
        assert!((prominence(&x, 3) - 0.2).abs() < 1e-12);
        assert!((prominence(&x, 1) - 0.6).abs() < 1e-12);
        assert!((prominence(&x, 5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mean_std_is_population() {
        let (m, s) = mean_std(&[1.0, 3.0]);
        assert_eq!(m, 2.0);
        assert_eq!(s, 1.0);
    }
}
