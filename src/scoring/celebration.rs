use crate::config::CelebrationSettings;
use crate::detect::{DetectionHistory, FrameDetections};
use crate::scoring::cluster::{Clusterer, KMeans};

/// Scores how strongly the players in a frame are bunched together.
///
/// A frame with more than `min_persons` people has their box centers split
/// into `min(max_clusters, persons)` clusters; the score is the share of
/// people in the largest one. Frames are scored independently. A clustering
/// failure yields `fallback_score` instead of an error.
#[derive(Clone, Debug)]
pub struct CelebrationScorer<C = KMeans> {
    clusterer: C,
    min_persons: usize,
    max_clusters: usize,
    fallback_score: f64,
}

impl CelebrationScorer<KMeans> {
    pub fn from_config(settings: &CelebrationSettings) -> Self {
        Self::with_clusterer(settings, KMeans::default())
    }
}

impl Default for CelebrationScorer<KMeans> {
    fn default() -> Self {
        Self::from_config(&crate::config::HighlightConfig::default().celebration)
    }
}

impl<C: Clusterer> CelebrationScorer<C> {
    pub fn with_clusterer(settings: &CelebrationSettings, clusterer: C) -> Self {
        Self {
            clusterer,
            min_persons: settings.min_persons,
            max_clusters: settings.max_clusters.max(1),
            fallback_score: settings.fallback_score,
        }
    }

    pub fn score_frame(&self, frame: &FrameDetections) -> f64 {
        let centers: Vec<[f64; 2]> = frame
            .persons()
            .map(|p| {
                let (x, y) = p.bbox.center();
                [x as f64, y as f64]
            })
            .collect();
        if centers.len() <= self.min_persons {
            return 0.0;
        }

        let k = self.max_clusters.min(centers.len());
        match self.clusterer.cluster(&centers, k) {
            Ok(labels) => {
                let mut sizes = vec![0usize; k];
                for label in labels {
                    match sizes.get_mut(label) {
                        Some(size) => *size += 1,
                        None => {
                            log::warn!("clusterer returned label {} for k={}", label, k);
                            return self.fallback_score;
                        }
                    }
                }
                let largest = sizes.into_iter().max().unwrap_or(0);
                largest as f64 / centers.len() as f64
            }
            Err(e) => {
                log::warn!("celebration clustering failed, using fallback: {}", e);
                self.fallback_score
            }
        }
    }

    /// One score per frame, index-aligned with `history`.
    pub fn scores(&self, history: &DetectionHistory) -> Vec<f64> {
        history.iter().map(|frame| self.score_frame(frame)).collect()
    }
}
