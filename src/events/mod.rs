//! Goal-event localization over a fused per-frame probability signal.
//!
//! The signal is treated as a whole: a peak qualifies when it rises above
//! an adaptive threshold derived from the signal's own mean and spread,
//! stands clear of its surroundings, and is the highest candidate within
//! the minimum separation window.

pub mod peaks;

use crate::config::EventSettings;

#[derive(Clone, Debug)]
pub struct EventLocalizer {
    min_separation_secs: f64,
    height_std_multiplier: f64,
    min_prominence: f64,
}

impl Default for EventLocalizer {
    fn default() -> Self {
        Self {
            min_separation_secs: 20.0,
            height_std_multiplier: 1.0,
            min_prominence: 0.3,
        }
    }
}

impl EventLocalizer {
    pub fn from_config(settings: &EventSettings) -> Self {
        Self {
            min_separation_secs: settings.min_event_separation_seconds,
            height_std_multiplier: settings.height_std_multiplier,
            min_prominence: settings.min_prominence,
        }
    }

    /// Minimum spacing between two peaks, in frames.
    ///
    /// Rounded to the nearest frame, then nudged up when rounding would let
    /// two peaks sit closer than the configured separation. Saturates at
    /// `usize::MAX`, which keeps only the tallest peak.
    pub fn min_distance_frames(&self, fps: f64) -> usize {
        let frames = (fps * self.min_separation_secs).round().max(1.0) as usize;
        if (frames as f64) / fps < self.min_separation_secs {
            frames.saturating_add(1)
        } else {
            frames
        }
    }

    /// Frame indices of the detected events, ascending.
    pub fn find_peak_indices(&self, probabilities: &[f64], fps: f64) -> Vec<usize> {
        if probabilities.is_empty() {
            return Vec::new();
        }
        if !(fps > 0.0) || !fps.is_finite() {
            log::warn!("cannot localize events with fps={}", fps);
            return Vec::new();
        }

        let signal: Vec<f64> = probabilities
            .iter()
            .map(|&p| if p.is_finite() { p } else { 0.0 })
            .collect();
        let (mean, std) = peaks::mean_std(&signal);
        let threshold = mean + self.height_std_multiplier * std;

        let candidates: Vec<usize> = peaks::local_maxima(&signal)
            .into_iter()
            .filter(|&i| signal[i] >= threshold)
            .collect();
        let spaced = peaks::select_by_distance(&signal, &candidates, self.min_distance_frames(fps));
        let events: Vec<usize> = spaced
            .into_iter()
            .filter(|&i| peaks::prominence(&signal, i) >= self.min_prominence)
            .collect();

        log::debug!(
            "event localization: threshold={:.3} candidates={} events={}",
            threshold,
            candidates.len(),
            events.len()
        );
        events
    }

    /// Event timestamps in seconds, ascending.
    pub fn find_events(&self, probabilities: &[f64], fps: f64) -> Vec<f64> {
        self.find_peak_indices(probabilities, fps)
            .into_iter()
            .map(|i| i as f64 / fps)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spike(len: usize, at: &[(usize, f64)]) -> Vec<f64> {
        let mut x = vec![0.0; len];
        for &(i, v) in at {
            x[i] = v;
        }
        x
    }

    #[test]
    fn empty_or_flat_signal_has_no_events() {
        let localizer = EventLocalizer::default();
        assert!(localizer.find_events(&[], 30.0).is_empty());
        assert!(localizer.find_events(&[0.0; 900], 30.0).is_empty());
        assert!(localizer.find_events(&[0.7; 900], 30.0).is_empty());
    }

    #[test]
    fn single_spike_is_one_event() {
        let localizer = EventLocalizer::default();
        let events = localizer.find_events(&spike(1000, &[(500, 1.0)]), 25.0);
        assert_eq!(events, vec![20.0]);
    }

    #[test]
    fn close_peaks_keep_the_higher_one() {
        let localizer = EventLocalizer::default();
        let x = spike(3000, &[(100, 0.8), (110, 0.9)]);
        assert_eq!(localizer.find_events(&x, 30.0), vec![110.0 / 30.0]);
    }

    #[test]
    fn separated_peaks_are_both_events() {
        let localizer = EventLocalizer::default();
        let x = spike(3000, &[(300, 0.9), (1200, 0.8)]);
        assert_eq!(localizer.find_events(&x, 30.0), vec![10.0, 40.0]);
    }

    #[test]
    fn shallow_peak_is_not_an_event() {
        let localizer = EventLocalizer::default();
        let x = spike(1000, &[(500, 0.2)]);
        assert!(localizer.find_events(&x, 30.0).is_empty());
    }

    #[test]
    fn distance_is_rounded_up_when_needed() {
        let localizer = EventLocalizer::default();
        assert_eq!(localizer.min_distance_frames(30.0), 600);
        assert_eq!(localizer.min_distance_frames(29.97), 600);
        assert_eq!(localizer.min_distance_frames(0.01), 1);
    }

    #[test]
    fn huge_separation_keeps_only_the_tallest_peak() {
        let localizer = EventLocalizer {
            min_separation_secs: 1e30,
            ..EventLocalizer::default()
        };
        assert_eq!(localizer.min_distance_frames(30.0), usize::MAX);
        let x = spike(3000, &[(300, 0.9), (1200, 0.8)]);
        assert_eq!(localizer.find_events(&x, 30.0), vec![10.0]);
    }

    #[test]
    fn events_are_sorted_and_separated() {
        let localizer = EventLocalizer::default();
        let mut rng = StdRng::seed_from_u64(3);
        let x: Vec<f64> = (0..20_000).map(|_| rng.gen::<f64>()).collect();
        let events = localizer.find_events(&x, 29.97);
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(pair[1] - pair[0] >= 20.0 - 1e-9);
        }
    }
}
