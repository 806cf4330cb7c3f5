//! Cluster partitioning of the oriented image sequence
//!
//! Two policies:
//! - [`partition_by_count`]: contiguous, near-equal slices in capture order.
//!   This is the production policy; contiguous flight segments are what the
//!   pairwise stitcher needs.
//! - [`partition_by_similarity`]: seeded k-means over coordinates, kept for
//!   debugging and comparison.

use crate::constants::kmeans;
use crate::error::{Result, StitchError};
use crate::geometry::Coordinate;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Ordered group of indices into the filtered image sequence
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cluster {
    pub indices: Vec<usize>,
}

impl Cluster {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether the indices form one ascending run without gaps
    pub fn is_contiguous(&self) -> bool {
        self.indices.windows(2).all(|pair| pair[1] == pair[0] + 1)
    }
}

/// Partitioning policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind")]
pub enum ClusterPolicy {
    /// Contiguous near-equal slices
    #[default]
    ByCount,
    /// K-means over coordinates
    BySimilarity { max_iterations: usize, seed: u64 },
}

impl ClusterPolicy {
    pub fn by_similarity() -> Self {
        ClusterPolicy::BySimilarity {
            max_iterations: kmeans::MAX_ITERATIONS,
            seed: kmeans::SEED,
        }
    }

    /// Partition `coordinates` into `n_clusters` groups under this policy
    pub fn partition(&self, coordinates: &[Coordinate], n_clusters: usize) -> Result<Vec<Cluster>> {
        match *self {
            ClusterPolicy::ByCount => partition_by_count(coordinates.len(), n_clusters),
            ClusterPolicy::BySimilarity {
                max_iterations,
                seed,
            } => partition_by_similarity(coordinates, n_clusters, max_iterations, seed),
        }
    }
}

/// Split `image_count` indices into `n_clusters` contiguous slices
///
/// Sizes differ by at most one; the first `image_count % n_clusters`
/// clusters carry the extra image. When `n_clusters > image_count` the
/// trailing clusters are empty.
pub fn partition_by_count(image_count: usize, n_clusters: usize) -> Result<Vec<Cluster>> {
    if n_clusters == 0 {
        return Err(StitchError::invalid_parameter("n_clusters", n_clusters));
    }

    let base = image_count / n_clusters;
    let remainder = image_count % n_clusters;

    let mut clusters = Vec::with_capacity(n_clusters);
    let mut start = 0;
    for i in 0..n_clusters {
        let size = base + usize::from(i < remainder);
        clusters.push(Cluster::new((start..start + size).collect()));
        start += size;
    }
    Ok(clusters)
}

/// Group coordinates with seeded k-means
///
/// Initial centroids are `n_clusters` distinct points drawn with the given
/// seed. Iteration stops when no centroid moves beyond tolerance or after
/// `max_iterations`. A centroid that loses every point keeps its position.
pub fn partition_by_similarity(
    coordinates: &[Coordinate],
    n_clusters: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<Vec<Cluster>> {
    if n_clusters == 0 || n_clusters > coordinates.len() {
        return Err(StitchError::invalid_parameter(
            "n_clusters",
            format!("{} (points: {})", n_clusters, coordinates.len()),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids: Vec<Coordinate> =
        rand::seq::index::sample(&mut rng, coordinates.len(), n_clusters)
            .into_iter()
            .map(|i| coordinates[i])
            .collect();
    let mut labels = vec![0usize; coordinates.len()];

    for iteration in 0..max_iterations {
        for (label, point) in labels.iter_mut().zip(coordinates) {
            *label = nearest_centroid(point, &centroids);
        }

        let updated = recompute_centroids(coordinates, &labels, &centroids);
        let converged = centroids
            .iter()
            .zip(&updated)
            .all(|(old, new)| close(old.latitude, new.latitude) && close(old.longitude, new.longitude));
        centroids = updated;

        if converged {
            debug!("k-means converged after {} iterations", iteration + 1);
            break;
        }
    }

    let mut clusters = vec![Cluster::default(); n_clusters];
    for (index, &label) in labels.iter().enumerate() {
        clusters[label].indices.push(index);
    }
    Ok(clusters)
}

fn nearest_centroid(point: &Coordinate, centroids: &[Coordinate]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (k, centroid) in centroids.iter().enumerate() {
        let distance = point.distance(centroid);
        if distance < best_distance {
            best = k;
            best_distance = distance;
        }
    }
    best
}

fn recompute_centroids(
    coordinates: &[Coordinate],
    labels: &[usize],
    previous: &[Coordinate],
) -> Vec<Coordinate> {
    let mut sums = vec![(0.0, 0.0, 0usize); previous.len()];
    for (point, &label) in coordinates.iter().zip(labels) {
        let entry = &mut sums[label];
        entry.0 += point.latitude;
        entry.1 += point.longitude;
        entry.2 += 1;
    }

    sums.iter()
        .zip(previous)
        .map(|(&(lat, lon, n), &old)| {
            if n == 0 {
                old
            } else {
                Coordinate::new(lat / n as f64, lon / n as f64)
            }
        })
        .collect()
}

/// Element-wise closeness test with absolute and relative tolerance
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= kmeans::ABSOLUTE_TOLERANCE + kmeans::RELATIVE_TOLERANCE * b.abs()
}

/// Whether `clusters` is an order-preserving exact cover of `0..image_count`
pub fn is_exact_partition(clusters: &[Cluster], image_count: usize) -> bool {
    let flattened: Vec<usize> = clusters.iter().flat_map(|c| c.indices.iter().copied()).collect();
    flattened.len() == image_count && flattened.iter().enumerate().all(|(i, &index)| i == index)
}
