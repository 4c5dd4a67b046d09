//! Per-frame signals and their fusion into one goal probability per frame.
//!
//! Every sequence produced here is index-aligned with the
//! [`DetectionHistory`](crate::detect::DetectionHistory) it was computed from.

pub mod celebration;
pub mod cluster;
pub mod fusion;
pub mod goal_area;

pub use celebration::CelebrationScorer;
pub use cluster::{Clusterer, KMeans};
pub use fusion::{normalize_by_max, ProbabilityFusion};
pub use goal_area::{GoalAreaScorer, GoalRegion};
