use crate::detect::{DetectionHistory, FrameDetections};

/// Rectangle expressed as fractions of frame width and height.
/// Boundaries are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoalRegion {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl GoalRegion {
    pub const LEFT: GoalRegion = GoalRegion {
        x1: 0.0,
        y1: 0.3,
        x2: 0.2,
        y2: 0.7,
    };
    pub const RIGHT: GoalRegion = GoalRegion {
        x1: 0.8,
        y1: 0.3,
        x2: 1.0,
        y2: 0.7,
    };

    fn contains(&self, x: f32, y: f32, width: f32, height: f32) -> bool {
        (self.x1 * width..=self.x2 * width).contains(&x)
            && (self.y1 * height..=self.y2 * height).contains(&y)
    }
}

/// Scores a frame by how confidently a ball sits in front of either goal.
#[derive(Clone, Debug)]
pub struct GoalAreaScorer {
    regions: Vec<GoalRegion>,
}

impl Default for GoalAreaScorer {
    fn default() -> Self {
        Self::new(vec![GoalRegion::LEFT, GoalRegion::RIGHT])
    }
}

impl GoalAreaScorer {
    pub fn new(regions: Vec<GoalRegion>) -> Self {
        Self { regions }
    }

    /// Highest confidence among balls whose box center lies in a goal
    /// region, or 0 when there is none.
    pub fn score(&self, frame: &FrameDetections) -> f64 {
        let (width, height) = (frame.width as f32, frame.height as f32);
        frame
            .balls()
            .filter(|ball| {
                let (cx, cy) = ball.bbox.center();
                self.regions
                    .iter()
                    .any(|region| region.contains(cx, cy, width, height))
            })
            .map(|ball| ball.confidence.clamp(0.0, 1.0) as f64)
            .fold(0.0, f64::max)
    }

    pub fn scores(&self, history: &DetectionHistory) -> Vec<f64> {
        history.iter().map(|frame| self.score(frame)).collect()
    }
}
