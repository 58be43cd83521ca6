//! Composite scoring of candidate servers against clusters.
//!
//! ```text
//! score = total_weight / (distance_km + epsilon) * (1 - alpha * load)
//! ```
//!
//! With a reference location, the distance fed into the score blends in the
//! detour through it: `(1 - beta) * d(c, s) + beta * (d(c, ref) + d(ref, s))`.

use std::cmp::Ordering;

use super::types::{CandidateServer, Recommendation};
use crate::cluster::Cluster;
use crate::config::ScoringConfig;
use crate::error_handling::InputError;
use crate::geo::{great_circle_km, Coordinate};

/// Score for one (cluster, candidate) pair at `distance_km`.
pub fn score(total_weight: u64, distance_km: f64, load: f64, config: &ScoringConfig) -> f64 {
    total_weight as f64 / (distance_km + config.epsilon_km) * (1.0 - config.load_penalty * load)
}

/// Ranks candidates for every cluster and keeps the best `top_n` of each.
///
/// Output follows cluster order, best candidate first within a cluster.
/// Candidates without a coordinate are left out; equal scores keep candidate
/// order.
pub fn recommend(
    clusters: &[Cluster],
    candidates: &[CandidateServer],
    reference: Option<&Coordinate>,
    config: &ScoringConfig,
) -> Result<Vec<Recommendation>, InputError> {
    config.validate()?;
    for candidate in candidates {
        candidate.validate()?;
    }

    let placed: Vec<(&CandidateServer, &Coordinate)> = candidates
        .iter()
        .filter_map(|c| c.coordinate.as_ref().map(|at| (c, at)))
        .collect();
    if placed.len() < candidates.len() {
        log::debug!(
            "{} candidates without a location excluded from ranking",
            candidates.len() - placed.len()
        );
    }

    let mut recommendations = Vec::with_capacity(clusters.len() * config.top_n);
    for cluster in clusters {
        let centroid = cluster.centroid();
        let detour_start = reference.map(|r| (r, great_circle_km(centroid, r)));

        let mut ranked: Vec<(&CandidateServer, f64, f64)> = placed
            .iter()
            .map(|(server, at)| {
                let distance_km = great_circle_km(centroid, at);
                let effective_km = match detour_start {
                    Some((reference, to_reference)) => {
                        let via_reference = to_reference + great_circle_km(reference, at);
                        (1.0 - config.reference_weight) * distance_km
                            + config.reference_weight * via_reference
                    }
                    None => distance_km,
                };
                let value = score(cluster.total_weight(), effective_km, server.load, config);
                (*server, distance_km, value)
            })
            .collect();

        ranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

        for (index, (server, distance_km, value)) in
            ranked.into_iter().take(config.top_n).enumerate()
        {
            recommendations.push(Recommendation {
                cluster: cluster.clone(),
                server: server.clone(),
                distance_km,
                score: value,
                rank: index + 1,
            });
        }
    }

    Ok(recommendations)
}
