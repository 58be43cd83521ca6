//! Geo-clusterer.
//!
//! Groups weighted coordinates into at most `k` clusters. Partitioning treats
//! latitude and longitude as a flat plane, which is close enough at city
//! precision; great-circle distance is only used downstream for scoring.

mod kmeans;
mod types;

use std::collections::{HashMap, HashSet};

use crate::config::ClusterConfig;
use crate::error_handling::InputError;
use crate::geo::{Coordinate, Resolutions};

pub use types::{Cluster, PeerCounts, WeightedPoint};

/// Merges resolver output with peer counts.
///
/// Unresolved addresses are skipped; a zero count is rejected.
pub fn weighted_points(
    resolved: &Resolutions,
    counts: &PeerCounts,
) -> Result<Vec<WeightedPoint>, InputError> {
    let mut points = Vec::with_capacity(counts.len());
    for (address, weight) in counts {
        if *weight == 0 {
            return Err(InputError::InvalidWeight {
                address: address.clone(),
                weight: *weight,
            });
        }
        if let Some(Some(coordinate)) = resolved.get(address) {
            points.push(WeightedPoint {
                address: address.clone(),
                coordinate: coordinate.clone(),
                weight: *weight,
            });
        }
    }
    Ok(points)
}

/// Partitions `points` into weighted clusters.
///
/// The effective cluster count is `min(config.clusters, distinct positions)`,
/// so no cluster is ever empty. Points are considered in ascending address
/// order, which makes the result deterministic for a fixed seed. Clusters come
/// back heaviest first; members are in ascending address order.
pub fn cluster(points: &[WeightedPoint], config: &ClusterConfig) -> Result<Vec<Cluster>, InputError> {
    if config.clusters == 0 {
        return Err(InputError::InvalidClusterCount(config.clusters));
    }
    if let Some(point) = points.iter().find(|p| p.weight == 0) {
        return Err(InputError::InvalidWeight {
            address: point.address.clone(),
            weight: point.weight,
        });
    }
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let mut ordered: Vec<&WeightedPoint> = points.iter().collect();
    ordered.sort_by(|a, b| a.address.cmp(&b.address));

    let k = config.clusters.min(distinct_positions(&ordered));
    if k < config.clusters {
        log::info!(
            "Only {} distinct locations; reducing cluster count from {} to {}",
            k,
            config.clusters,
            k
        );
    }

    let plane: Vec<kmeans::Point> = ordered
        .iter()
        .map(|p| [p.coordinate.latitude(), p.coordinate.longitude()])
        .collect();
    let weights: Vec<f64> = ordered.iter().map(|p| f64::from(p.weight)).collect();

    let partition = kmeans::weighted_kmeans(&plane, &weights, k, config);
    log::debug!(
        "Clustered {} points into {} groups (inertia {:.4})",
        ordered.len(),
        k,
        partition.inertia
    );

    let mut groups: Vec<Vec<WeightedPoint>> = vec![Vec::new(); k];
    for (point, index) in ordered.iter().zip(&partition.assignments) {
        groups[*index].push((*point).clone());
    }

    let mut clusters = Vec::with_capacity(k);
    for members in groups.into_iter().filter(|g| !g.is_empty()) {
        if let Some(centroid) = centroid_of(&members)? {
            clusters.push(Cluster::new(centroid, members));
        }
    }

    clusters.sort_by(|a, b| {
        b.total_weight()
            .cmp(&a.total_weight())
            .then_with(|| a.members()[0].address.cmp(&b.members()[0].address))
    });
    Ok(clusters)
}

/// Weight-averaged position of all points, or `None` for no points.
pub fn overall_centroid(points: &[WeightedPoint]) -> Option<Coordinate> {
    let mut ordered: Vec<WeightedPoint> = points.to_vec();
    ordered.sort_by(|a, b| a.address.cmp(&b.address));
    centroid_of(&ordered).ok().flatten()
}

fn distinct_positions(points: &[&WeightedPoint]) -> usize {
    // + 0.0 folds -0.0 into 0.0
    points
        .iter()
        .map(|p| {
            (
                (p.coordinate.latitude() + 0.0).to_bits(),
                (p.coordinate.longitude() + 0.0).to_bits(),
            )
        })
        .collect::<HashSet<_>>()
        .len()
}

/// Weighted mean position, labelled with the heaviest country and city.
fn centroid_of(members: &[WeightedPoint]) -> Result<Option<Coordinate>, InputError> {
    let Some(origin) = members.first().map(|p| &p.coordinate) else {
        return Ok(None);
    };

    let mut total = 0.0;
    let (mut lat, mut lon) = (0.0, 0.0);
    for point in members {
        let w = f64::from(point.weight);
        total += w;
        lat += w * (point.coordinate.latitude() - origin.latitude());
        lon += w * (point.coordinate.longitude() - origin.longitude());
    }

    let latitude = (origin.latitude() + lat / total).clamp(-90.0, 90.0);
    let longitude = (origin.longitude() + lon / total).clamp(-180.0, 180.0);

    let country = heaviest_label(members, |c| c.country());
    let city = heaviest_label(members, |c| c.city());
    Ok(Some(Coordinate::new(latitude, longitude)?.with_place(country, city)))
}

/// Label carrying the most weight; ties go to the label seen first.
fn heaviest_label<F>(members: &[WeightedPoint], label: F) -> Option<String>
where
    F: Fn(&Coordinate) -> Option<&str>,
{
    let mut totals: HashMap<&str, (u64, usize)> = HashMap::new();
    for (order, point) in members.iter().enumerate() {
        if let Some(name) = label(&point.coordinate) {
            let entry = totals.entry(name).or_insert((0, order));
            entry.0 += u64::from(point.weight);
        }
    }
    totals
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)))
        .map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(address: &str, lat: f64, lon: f64, weight: u32) -> WeightedPoint {
        WeightedPoint::new(address, Coordinate::new(lat, lon).unwrap(), weight).unwrap()
    }

    fn config(clusters: usize) -> ClusterConfig {
        ClusterConfig {
            clusters,
            ..ClusterConfig::default()
        }
    }

    fn sample() -> Vec<WeightedPoint> {
        vec![
            point("10.0.0.1", 48.85, 2.35, 4),
            point("10.0.0.2", 48.80, 2.30, 2),
            point("10.0.0.3", 52.52, 13.40, 7),
            point("10.0.0.4", 52.50, 13.35, 1),
            point("10.0.0.5", 40.71, -74.00, 3),
            point("10.0.0.6", 40.73, -73.99, 3),
        ]
    }

    #[test]
    fn test_zero_clusters_rejected() {
        assert_eq!(
            cluster(&sample(), &config(0)),
            Err(InputError::InvalidClusterCount(0))
        );
    }

    #[test]
    fn test_empty_input_yields_no_clusters() {
        assert_eq!(cluster(&[], &config(3)), Ok(Vec::new()));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let first = cluster(&sample(), &config(3)).unwrap();
        let second = cluster(&sample(), &config(3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(
            cluster(&sample(), &config(3)).unwrap(),
            cluster(&reversed, &config(3)).unwrap()
        );
    }

    #[test]
    fn test_weight_is_conserved() {
        let clusters = cluster(&sample(), &config(3)).unwrap();
        let total: u64 = clusters.iter().map(Cluster::total_weight).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_groups_by_city() {
        let clusters = cluster(&sample(), &config(3)).unwrap();
        assert_eq!(clusters.len(), 3);

        // Heaviest first: Berlin (8), then New York and Paris (6 each) by address
        let addresses: Vec<Vec<&str>> = clusters
            .iter()
            .map(|c| c.members().iter().map(|p| p.address.as_str()).collect())
            .collect();
        assert_eq!(
            addresses,
            vec![
                vec!["10.0.0.3", "10.0.0.4"],
                vec!["10.0.0.1", "10.0.0.2"],
                vec!["10.0.0.5", "10.0.0.6"],
            ]
        );
    }

    #[test]
    fn test_fewer_distinct_points_than_k() {
        let points = vec![
            point("1.1.1.1", 10.0, 10.0, 1),
            point("1.1.1.2", 10.0, 10.0, 2),
            point("2.2.2.2", -5.0, 30.0, 1),
        ];
        let clusters = cluster(&points, &config(5)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| !c.members().is_empty()));
    }

    #[test]
    fn test_signed_zero_is_one_position() {
        let points = vec![
            point("1.1.1.1", 0.0, 0.0, 1),
            point("1.1.1.2", -0.0, -0.0, 1),
        ];
        let clusters = cluster(&points, &config(2)).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].total_weight(), 2);
    }

    #[test]
    fn test_identical_points_centroid_exact() {
        let points: Vec<WeightedPoint> = (1..=5)
            .map(|i| point(&format!("10.0.0.{}", i), 37.774929, -122.419416, i))
            .collect();
        let clusters = cluster(&points, &config(1)).unwrap();
        assert_eq!(clusters[0].centroid().latitude(), 37.774929);
        assert_eq!(clusters[0].centroid().longitude(), -122.419416);
    }

    #[test]
    fn test_symmetric_points_centroid_is_midpoint() {
        let points = vec![point("1.1.1.1", 10.0, 20.0, 3), point("2.2.2.2", 30.0, 40.0, 3)];
        let centroid = overall_centroid(&points).unwrap();
        assert_eq!(centroid.latitude(), 20.0);
        assert_eq!(centroid.longitude(), 30.0);
    }

    #[test]
    fn test_overall_centroid_empty() {
        assert_eq!(overall_centroid(&[]), None);
    }

    #[test]
    fn test_centroid_takes_heaviest_place() {
        let paris = Coordinate::new(48.85, 2.35)
            .unwrap()
            .with_place(Some("France".into()), Some("Paris".into()));
        let lyon = Coordinate::new(45.76, 4.83)
            .unwrap()
            .with_place(Some("France".into()), Some("Lyon".into()));
        let points = vec![
            WeightedPoint::new("1.1.1.1", paris, 1).unwrap(),
            WeightedPoint::new("2.2.2.2", lyon, 5).unwrap(),
        ];
        let centroid = overall_centroid(&points).unwrap();
        assert_eq!(centroid.country(), Some("France"));
        assert_eq!(centroid.city(), Some("Lyon"));
    }

    #[test]
    fn test_weighted_points_skips_unresolved() {
        let mut resolved = Resolutions::new();
        resolved.insert("1.1.1.1".into(), Some(Coordinate::new(1.0, 1.0).unwrap()));
        resolved.insert("2.2.2.2".into(), None);
        let counts: PeerCounts = [("1.1.1.1".to_string(), 3), ("2.2.2.2".to_string(), 1)]
            .into_iter()
            .collect();

        let points = weighted_points(&resolved, &counts).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].weight, 3);
    }

    #[test]
    fn test_weighted_points_rejects_zero_count() {
        let counts: PeerCounts = [("1.1.1.1".to_string(), 0)].into_iter().collect();
        assert!(matches!(
            weighted_points(&Resolutions::new(), &counts),
            Err(InputError::InvalidWeight { .. })
        ));
    }
}
