//! Weighted k-means over a flat (latitude, longitude) plane.
//!
//! Seeding is weighted k-means++ from a seeded `StdRng`; several restarts run
//! from the same generator and the lowest-inertia partition wins. Points are
//! expected in a stable order; assignment ties go to the lower cluster index.

use rand::prelude::*;

use crate::config::{ClusterConfig, KMEANS_TOLERANCE};

pub(crate) type Point = [f64; 2];

/// Result of one clustering run.
#[derive(Debug, Clone)]
pub(crate) struct Partition {
    /// Cluster index per input point
    pub assignments: Vec<usize>,
    pub inertia: f64,
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0 * d0 + d1 * d1
}

/// Partitions `points` into `k` non-empty clusters.
///
/// `k` must be at least 1 and at most the number of distinct positions.
pub(crate) fn weighted_kmeans(
    points: &[Point],
    weights: &[f64],
    k: usize,
    config: &ClusterConfig,
) -> Partition {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut best = {
        let centers = seed_centers(points, weights, k, &mut rng);
        lloyd(points, weights, centers, config.max_iterations)
    };

    for restart in 1..config.restarts {
        let centers = seed_centers(points, weights, k, &mut rng);
        let run = lloyd(points, weights, centers, config.max_iterations);
        if run.inertia < best.inertia {
            log::debug!(
                "Restart {} improved inertia {:.6} -> {:.6}",
                restart,
                best.inertia,
                run.inertia
            );
            best = run;
        }
    }

    best
}

/// Draws an index with probability proportional to `mass`.
fn sample_index(mass: &[f64], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = mass.iter().sum();
    if total.is_nan() || total <= 0.0 {
        return None;
    }

    let mut target = rng.gen::<f64>() * total;
    let mut last_positive = None;
    for (index, m) in mass.iter().enumerate() {
        if *m <= 0.0 {
            continue;
        }
        if target < *m {
            return Some(index);
        }
        target -= m;
        last_positive = Some(index);
    }
    // Rounding left a sliver past the final bucket
    last_positive
}

/// Weighted k-means++ seeding.
fn seed_centers(points: &[Point], weights: &[f64], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centers: Vec<Point> = Vec::with_capacity(k);
    let first = sample_index(weights, rng).unwrap_or(0);
    centers.push(points[first]);

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[first]))
        .collect();

    while centers.len() < k {
        let mass: Vec<f64> = nearest
            .iter()
            .zip(weights)
            .map(|(d, w)| d * w)
            .collect();

        let next = match sample_index(&mass, rng) {
            Some(index) => index,
            // Every point sits on a centre; take the first uncovered position
            None => match nearest.iter().position(|d| *d > 0.0) {
                Some(index) => index,
                None => break,
            },
        };

        let center = points[next];
        centers.push(center);
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &center));
        }
    }

    centers
}

/// Index of the closest centre; ties go to the lowest index.
fn nearest_center(point: &Point, centers: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, center) in centers.iter().enumerate() {
        let d = squared_distance(point, center);
        if d < best.1 {
            best = (index, d);
        }
    }
    best
}

/// Weighted mean of `members`, taken relative to the first member so
/// identical points reproduce exactly.
fn weighted_mean(points: &[Point], weights: &[f64], members: &[usize]) -> Option<Point> {
    let origin = points[*members.first()?];
    let mut total = 0.0;
    let mut offset = [0.0, 0.0];
    for &i in members {
        total += weights[i];
        offset[0] += weights[i] * (points[i][0] - origin[0]);
        offset[1] += weights[i] * (points[i][1] - origin[1]);
    }
    Some([origin[0] + offset[0] / total, origin[1] + offset[1] / total])
}

fn lloyd(points: &[Point], weights: &[f64], mut centers: Vec<Point>, max_iterations: usize) -> Partition {
    let k = centers.len();
    let mut assignments: Vec<usize> = vec![usize::MAX; points.len()];
    let mut distances = vec![0.0; points.len()];

    for iteration in 0..max_iterations.max(1) {
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let (cluster, d) = nearest_center(point, &centers);
            if assignments[i] != cluster {
                assignments[i] = cluster;
                changed = true;
            }
            distances[i] = d;
        }

        reseed_empty(&mut assignments, &mut distances, &mut centers, points);

        if !changed && iteration > 0 {
            break;
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (i, cluster) in assignments.iter().enumerate() {
            members[*cluster].push(i);
        }

        let mut shift: f64 = 0.0;
        for (cluster, indices) in members.iter().enumerate() {
            if let Some(mean) = weighted_mean(points, weights, indices) {
                shift = shift.max(squared_distance(&centers[cluster], &mean));
                centers[cluster] = mean;
            }
        }

        if shift <= KMEANS_TOLERANCE && iteration > 0 {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(weights)
        .zip(&assignments)
        .map(|((p, w), c)| w * squared_distance(p, &centers[*c]))
        .sum();

    Partition {
        assignments,
        inertia,
    }
}

/// Moves every empty cluster onto the point farthest from its own centre.
fn reseed_empty(
    assignments: &mut [usize],
    distances: &mut [f64],
    centers: &mut [Point],
    points: &[Point],
) {
    let mut sizes = vec![0usize; centers.len()];
    for cluster in assignments.iter() {
        sizes[*cluster] += 1;
    }

    for empty in 0..centers.len() {
        if sizes[empty] > 0 {
            continue;
        }

        // Farthest point whose cluster can spare it
        let donor = (0..points.len())
            .filter(|i| sizes[assignments[*i]] > 1 && distances[*i] > 0.0)
            .fold(None, |best: Option<usize>, i| match best {
                Some(b) if distances[b] >= distances[i] => Some(b),
                _ => Some(i),
            });

        let Some(i) = donor else {
            continue;
        };
        sizes[assignments[i]] -= 1;
        sizes[empty] += 1;
        assignments[i] = empty;
        distances[i] = 0.0;
        centers[empty] = points[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> ClusterConfig {
        ClusterConfig {
            seed,
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn test_separates_two_groups() {
        let points = [[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
        let weights = [1.0; 4];
        let partition = weighted_kmeans(&points, &weights, 2, &config(7));

        let a = &partition.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[2], a[3]);
        assert_ne!(a[0], a[2]);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let points: Vec<Point> = (0..30)
            .map(|i| [(i * 7 % 23) as f64, (i * 11 % 17) as f64])
            .collect();
        let weights: Vec<f64> = (0..30).map(|i| (i % 5 + 1) as f64).collect();

        let first = weighted_kmeans(&points, &weights, 4, &config(42));
        let second = weighted_kmeans(&points, &weights, 4, &config(42));
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.inertia, second.inertia);
    }

    #[test]
    fn test_no_empty_clusters_when_k_equals_distinct() {
        let points = [[0.0, 0.0], [0.0, 0.0], [5.0, 5.0], [9.0, 1.0]];
        let weights = [100.0, 100.0, 1.0, 1.0];
        let partition = weighted_kmeans(&points, &weights, 3, &config(3));

        let mut used = partition.assignments.clone();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn test_heavy_point_pulls_center() {
        let points = [[0.0, 0.0], [10.0, 0.0]];
        let weights = [3.0, 1.0];
        let mean = weighted_mean(&points, &weights, &[0, 1]).unwrap();
        assert!((mean[0] - 2.5).abs() < 1e-12);
        assert_eq!(mean[1], 0.0);
    }

    #[test]
    fn test_sample_index_skips_zero_mass() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(sample_index(&[0.0, 2.0, 0.0], &mut rng), Some(1));
        }
        assert_eq!(sample_index(&[0.0, 0.0], &mut rng), None);
    }
}
