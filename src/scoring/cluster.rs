//! Point clustering behind a small trait so the partitioning method can be
//! swapped without touching the scorers.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Partition 2-D points into `k` groups.
pub trait Clusterer {
    /// Cluster label in `0..k` for every point, index-aligned with `points`.
    fn cluster(&self, points: &[[f64; 2]], k: usize) -> Result<Vec<usize>>;
}

/// Lloyd's k-means with k-means++ seeding and several restarts.
///
/// Seeded, so the same input always yields the same labels. Coincident
/// points always share a label.
#[derive(Clone, Debug)]
pub struct KMeans {
    seed: u64,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl KMeans {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_restarts(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    fn run_once(&self, points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> (Vec<usize>, f64) {
        let mut centers = seed_centers(points, k, rng);
        let mut labels = vec![0usize; points.len()];

        for _ in 0..self.max_iter {
            assign(points, &centers, &mut labels);
            fill_empty_clusters(points, &mut centers, &mut labels);

            let updated = recompute_centers(points, &labels, &centers);
            let shift = centers
                .iter()
                .zip(&updated)
                .map(|(a, b)| sq_dist(a, b))
                .fold(0.0, f64::max);
            centers = updated;
            if shift <= self.tolerance * self.tolerance {
                break;
            }
        }

        assign(points, &centers, &mut labels);
        fill_empty_clusters(points, &mut centers, &mut labels);
        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| sq_dist(p, &centers[l]))
            .sum();
        (labels, inertia)
    }
}

impl Clusterer for KMeans {
    fn cluster(&self, points: &[[f64; 2]], k: usize) -> Result<Vec<usize>> {
        if points.is_empty() {
            return Err(anyhow!("cannot cluster an empty point set"));
        }
        if k == 0 || k > points.len() {
            return Err(anyhow!(
                "cluster count {} invalid for {} points",
                k,
                points.len()
            ));
        }
        if points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(anyhow!("points contain non-finite coordinates"));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(Vec<usize>, f64)> = None;
        for _ in 0..self.n_init {
            let (labels, inertia) = self.run_once(points, k, &mut rng);
            if best.as_ref().map_or(true, |(_, b)| inertia < *b) {
                best = Some((labels, inertia));
            }
        }
        best.map(|(labels, _)| labels)
            .ok_or_else(|| anyhow!("k-means produced no result"))
    }
}

fn sq_dist(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// k-means++: each next center is drawn with probability proportional to
/// its squared distance from the nearest chosen center.
fn seed_centers(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centers
                    .iter()
                    .map(|c| sq_dist(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            // Every point already coincides with a center.
            centers.push(points[rng.gen_range(0..points.len())]);
            continue;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = None;
        for (idx, w) in weights.iter().enumerate() {
            cumulative += w;
            if *w > 0.0 {
                chosen = Some(idx);
                if cumulative > target {
                    break;
                }
            }
        }
        let idx = chosen.unwrap_or(0);
        centers.push(points[idx]);
    }
    centers
}

/// Nearest center; ties go to the lowest index.
fn assign(points: &[[f64; 2]], centers: &[[f64; 2]], labels: &mut [usize]) {
    for (p, label) in points.iter().zip(labels.iter_mut()) {
        let mut best = (0usize, f64::INFINITY);
        for (idx, c) in centers.iter().enumerate() {
            let d = sq_dist(p, c);
            if d < best.1 {
                best = (idx, d);
            }
        }
        *label = best.0;
    }
}

/// Give each empty cluster the point farthest from its own center, taken
/// from a cluster that can spare one. Points sitting exactly on their
/// center are never moved.
fn fill_empty_clusters(points: &[[f64; 2]], centers: &mut [[f64; 2]], labels: &mut [usize]) {
    let k = centers.len();
    let mut sizes = vec![0usize; k];
    for &l in labels.iter() {
        sizes[l] += 1;
    }

    for empty in 0..k {
        if sizes[empty] > 0 {
            continue;
        }
        let donor = points
            .iter()
            .enumerate()
            .filter(|(i, _)| sizes[labels[*i]] > 1)
            .map(|(i, p)| (i, sq_dist(p, &centers[labels[i]])))
            .filter(|(_, d)| *d > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((i, _)) = donor {
            sizes[labels[i]] -= 1;
            labels[i] = empty;
            sizes[empty] = 1;
            centers[empty] = points[i];
        }
    }
}

fn recompute_centers(points: &[[f64; 2]], labels: &[usize], previous: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut sums = vec![[0.0f64; 2]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (p, &l) in points.iter().zip(labels) {
        sums[l][0] += p[0];
        sums[l][1] += p[1];
        counts[l] += 1;
    }
    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), prev)| {
            if count == 0 {
                *prev
            } else {
                [sum[0] / count as f64, sum[1] / count as f64]
            }
        })
        .collect()
}
