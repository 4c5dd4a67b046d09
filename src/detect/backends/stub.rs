use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, ObjectClass};

/// Half-widths of huddled players' boxes, nearest last. Consecutive sizes
/// overlap with IoU below 0.4.
const HUDDLE_HALF_SIZES: [f32; 8] = [6.0, 10.0, 16.0, 26.0, 42.0, 67.0, 107.0, 171.0];

/// Stub backend for tests and `stub://` runs.
///
/// Returns a pre-built script of per-frame detections, one entry per call,
/// and nothing once the script is exhausted. Pixels are ignored.
pub struct StubBackend {
    script: Vec<Vec<Detection>>,
    cursor: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Synthetic match footage: players spread over the pitch, the ball in
    /// midfield, and around each goal time the ball inside the left goal
    /// mouth followed by players piling up next to it.
    pub fn synthetic_match(
        fps: f64,
        total_frames: usize,
        width: u32,
        height: u32,
        goal_times: &[f64],
    ) -> Self {
        let (w, h) = (width as f32, height as f32);
        let script = (0..total_frames)
            .map(|index| {
                let t = index as f64 / fps;
                let ball_in_goal = goal_times.iter().any(|g| (t - g).abs() <= 0.5);
                let celebrating = goal_times.iter().any(|g| t >= *g && t <= g + 3.0);

                let mut detections = Vec::new();
                if ball_in_goal {
                    detections.push(square(ObjectClass::Ball, 0.9, 0.1 * w, 0.5 * h, 8.0));
                } else {
                    detections.push(square(ObjectClass::Ball, 0.8, 0.5 * w, 0.5 * h, 8.0));
                }

                for player in 0..10 {
                    if celebrating {
                        if let Some(&half) = HUDDLE_HALF_SIZES.get(player) {
                            // Same center, different depth.
                            detections.push(square(ObjectClass::Person, 0.85, 0.25 * w, 0.5 * h, half));
                            continue;
                        }
                    }
                    let col = (player % 5) as f32;
                    let row = (player / 5) as f32;
                    let (x, y) = ((0.1 + 0.2 * col) * w, (0.25 + 0.5 * row) * h);
                    detections.push(square(ObjectClass::Person, 0.85, x, y, 30.0));
                }
                detections
            })
            .collect();
        Self::scripted(script)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn square(class: ObjectClass, confidence: f32, cx: f32, cy: f32, half: f32) -> Detection {
    Detection::new(
        class,
        confidence,
        BoundingBox::new(cx - half, cy - half, cx + half, cy + half),
    )
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        let detections = self.script.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_goes_quiet() {
        let ball = square(ObjectClass::Ball, 0.9, 10.0, 10.0, 2.0);
        let mut backend = StubBackend::scripted(vec![vec![ball], vec![]]);

        assert_eq!(backend.detect(&[], 0, 0).unwrap(), vec![ball]);
        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn synthetic_match_places_ball_in_goal_at_goal_time() {
        let mut backend = StubBackend::synthetic_match(10.0, 100, 640, 360, &[5.0]);
        let mut frames = Vec::new();
        for _ in 0..100 {
            frames.push(backend.detect(&[], 640, 360).unwrap());
        }

        let ball_x = |dets: &Vec<Detection>| {
            dets.iter()
                .find(|d| d.class == ObjectClass::Ball)
                .map(|d| d.bbox.center().0)
                .unwrap()
        };
        assert_eq!(ball_x(&frames[50]), 64.0);
        assert_eq!(ball_x(&frames[0]), 320.0);
        assert_eq!(frames[50].iter().filter(|d| d.class == ObjectClass::Person).count(), 10);
    }

    #[test]
    fn huddle_survives_nms() {
        let mut backend = StubBackend::synthetic_match(10.0, 100, 640, 360, &[5.0]);
        let frames: Vec<Vec<Detection>> = (0..100)
            .map(|_| backend.detect(&[], 640, 360).unwrap())
            .collect();
        let kept = crate::detect::nms::postprocess(frames[51].clone(), 0.45, 0.4);
        let huddled = kept
            .iter()
            .filter(|d| d.class == ObjectClass::Person && d.bbox.center() == (160.0, 180.0))
            .count();
        assert_eq!(huddled, 8);
    }
}
