use anyhow::{anyhow, Result};
use serde::Serialize;

/// Time span of one highlight clip, in seconds of the source video.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HighlightWindow {
    pub start: f64,
    pub end: f64,
    /// Goal instant measured from `start`.
    pub relative_goal_offset: f64,
}

impl HighlightWindow {
    /// Window of `pre` seconds before and `post` seconds after `goal`,
    /// clamped to `[0, duration]`. Clamping shortens the clip instead of
    /// failing.
    pub fn compute(goal: f64, duration: f64, pre: f64, post: f64) -> Result<Self> {
        if !(duration > 0.0) {
            return Err(anyhow!("video duration must be positive, got {}", duration));
        }
        if !(0.0..=duration).contains(&goal) {
            return Err(anyhow!(
                "goal timestamp {:.2}s outside video of {:.2}s",
                goal,
                duration
            ));
        }

        let start = (goal - pre).max(0.0);
        let naive_end = goal + post;
        let end = naive_end.min(duration);
        if naive_end > duration {
            log::debug!(
                "clamped highlight end {:.2}s to video duration {:.2}s",
                naive_end,
                duration
            );
        }
        if end <= start {
            return Err(anyhow!(
                "empty highlight window around {:.2}s ({:.2}..{:.2})",
                goal,
                start,
                end
            ));
        }

        Ok(Self {
            start,
            end,
            relative_goal_offset: goal - start,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_goal_clamps_start() {
        let w = HighlightWindow::compute(5.0, 100.0, 10.0, 10.0).unwrap();
        assert_eq!(w, HighlightWindow { start: 0.0, end: 15.0, relative_goal_offset: 5.0 });
    }

    #[test]
    fn late_goal_clamps_end() {
        let w = HighlightWindow::compute(98.0, 100.0, 10.0, 10.0).unwrap();
        assert_eq!(w, HighlightWindow { start: 88.0, end: 100.0, relative_goal_offset: 10.0 });
        assert_eq!(w.duration(), 12.0);
    }

    #[test]
    fn window_stays_inside_video() {
        for goal in [0.0, 0.5, 42.0, 99.9, 100.0] {
            let w = HighlightWindow::compute(goal, 100.0, 10.0, 10.0).unwrap();
            assert!(w.start >= 0.0 && w.end <= 100.0 && w.start < w.end);
            assert!((w.start + w.relative_goal_offset - goal).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(HighlightWindow::compute(5.0, 0.0, 10.0, 10.0).is_err());
        assert!(HighlightWindow::compute(-1.0, 100.0, 10.0, 10.0).is_err());
        assert!(HighlightWindow::compute(101.0, 100.0, 10.0, 10.0).is_err());
        assert!(HighlightWindow::compute(f64::NAN, 100.0, 10.0, 10.0).is_err());
        assert!(HighlightWindow::compute(0.0, 100.0, 0.0, 0.0).is_err());
    }
}
