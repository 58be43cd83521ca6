//! Analysis pipeline.
//!
//! resolve → weight merge → cluster → reference location → recommend.

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::app::LogProgress;
use crate::cluster::{cluster, overall_centroid, weighted_points, Cluster, PeerCounts};
use crate::config::{Config, LOGGING_INTERVAL};
use crate::error_handling::InputError;
use crate::geo::{AddressResolver, Coordinate};
use crate::recommend::{recommend, CandidateServer, Recommendation};

/// Outcome of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Sum of all peer counts
    pub total_connections: u64,
    /// Distinct peer addresses
    pub unique_addresses: usize,
    /// Addresses that resolved to a location
    pub resolved_addresses: usize,
    /// Eligible candidates offered to the scorer
    pub candidates_considered: usize,
    pub clusters: Vec<Cluster>,
    pub overall_centroid: Option<Coordinate>,
    /// Where the requester is, when it was looked up and found
    pub reference_location: Option<Coordinate>,
    pub recommendations: Vec<Recommendation>,
    /// True if the run was interrupted and results are partial
    pub cancelled: bool,
    pub elapsed_seconds: f64,
}

impl AnalysisReport {
    /// False when no address could be placed.
    pub fn has_locations(&self) -> bool {
        self.resolved_addresses > 0
    }

    /// The recommendation for the heaviest cluster.
    pub fn best_overall(&self) -> Option<&Recommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.rank == 1)
            .max_by_key(|r| r.cluster.total_weight())
    }
}

/// Runs the full analysis for `peers` against `candidates`.
///
/// Invalid settings are rejected before any lookup. A run in which no address
/// resolves still succeeds, with an empty report.
///
/// # Errors
///
/// Returns an error for invalid input: a malformed address, a zero peer
/// count, a zero cluster count or out-of-range scoring parameters.
pub async fn run_analysis(
    config: &Config,
    resolver: &AddressResolver,
    peers: &PeerCounts,
    candidates: &[CandidateServer],
) -> Result<AnalysisReport> {
    let start_time = Instant::now();
    let cluster_config = config.cluster_config();
    let scoring_config = config.scoring_config();

    if cluster_config.clusters == 0 {
        return Err(InputError::InvalidClusterCount(0)).context("Invalid cluster count");
    }
    scoring_config
        .validate()
        .context("Invalid scoring settings")?;

    let total_connections = peers.values().map(|c| u64::from(*c)).sum();
    log::info!(
        "Resolving {} unique addresses ({} connections)",
        peers.len(),
        total_connections
    );

    let mut progress = LogProgress::new("Resolved", LOGGING_INTERVAL);
    let mut sink = progress.sink();
    let resolved = resolver
        .resolve_many(peers.keys(), Some(&mut sink))
        .await
        .context("Failed to resolve peer addresses")?;

    let points = weighted_points(&resolved, peers).context("Invalid peer counts")?;
    let cancelled = resolver.cancellation_token().is_cancelled();

    let mut report = AnalysisReport {
        total_connections,
        unique_addresses: peers.len(),
        resolved_addresses: points.len(),
        candidates_considered: candidates.len(),
        clusters: Vec::new(),
        overall_centroid: None,
        reference_location: None,
        recommendations: Vec::new(),
        cancelled,
        elapsed_seconds: 0.0,
    };

    if points.is_empty() {
        log::warn!("No resolvable locations among {} addresses", peers.len());
        report.elapsed_seconds = start_time.elapsed().as_secs_f64();
        return Ok(report);
    }
    log::info!(
        "Located {} of {} addresses",
        points.len(),
        peers.len()
    );

    report.clusters = cluster(&points, &cluster_config).context("Clustering failed")?;
    report.overall_centroid = overall_centroid(&points);
    log::info!("Formed {} clusters", report.clusters.len());

    if !config.no_reference && !cancelled {
        report.reference_location = resolver.resolve_self().await;
        match &report.reference_location {
            Some(own) => log::info!("Own location: {}", own.place_label()),
            None => log::warn!("Could not determine own location; scoring without it"),
        }
    }

    report.recommendations = recommend(
        &report.clusters,
        candidates,
        report.reference_location.as_ref(),
        &scoring_config,
    )
    .context("Scoring failed")?;

    report.cancelled = resolver.cancellation_token().is_cancelled();
    report.elapsed_seconds = start_time.elapsed().as_secs_f64();
    log::info!(
        "Analysis finished in {:.1}s with {} recommendations",
        report.elapsed_seconds,
        report.recommendations.len()
    );
    Ok(report)
}
