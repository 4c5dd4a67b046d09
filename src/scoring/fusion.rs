use crate::config::FusionWeights;

/// Divide every value by the sequence maximum. Sequences whose maximum is
/// not positive are returned unchanged.
pub fn normalize_by_max(values: &[f64]) -> Vec<f64> {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        values.iter().map(|v| v / max).collect()
    } else {
        values.to_vec()
    }
}

/// Weighted combination of the normalized ball and celebration signals.
#[derive(Clone, Copy, Debug)]
pub struct ProbabilityFusion {
    weights: FusionWeights,
}

impl Default for ProbabilityFusion {
    fn default() -> Self {
        Self::new(FusionWeights {
            celebration: 0.35,
            ball: 0.65,
        })
    }
}

impl ProbabilityFusion {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    /// Fused score for each of `frame_count` frames. Indices missing from
    /// either input count as 0.
    pub fn fuse(&self, ball_scores: &[f64], celebration_scores: &[f64], frame_count: usize) -> Vec<f64> {
        let ball = normalize_by_max(ball_scores);
        let celebration = normalize_by_max(celebration_scores);

        (0..frame_count)
            .map(|i| {
                let b = ball.get(i).copied().unwrap_or(0.0);
                let c = celebration.get(i).copied().unwrap_or(0.0);
                self.weights.celebration * c + self.weights.ball * b
            })
            .collect()
    }
}
