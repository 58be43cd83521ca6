//! peer_cluster library: peer geolocation, clustering and server recommendation
//!
//! Turns a set of peer addresses with connection counts into a few
//! geographically coherent, weighted clusters and recommends the nearest
//! suitable remote server for each.
//!
//! The pipeline is resolve → cluster → score:
//! - [`geo::AddressResolver`] resolves addresses through a TTL/LRU cache, a
//!   rate-gated bulk provider and a pool of single-address fallbacks.
//! - [`cluster::cluster`] runs a seeded, weighted k-means.
//! - [`recommend::recommend`] ranks candidates per cluster by weight, distance,
//!   load and, optionally, the requester's own location.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use peer_cluster::{run_analysis, AddressResolver, Config, PeerCounts};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     clusters: 2,
//!     ..Default::default()
//! };
//! let client = Arc::new(reqwest::Client::new());
//! let resolver = AddressResolver::from_config(&config, client, CancellationToken::new())?;
//!
//! let peers: PeerCounts = [("1.1.1.1".to_string(), 10), ("8.8.8.8".to_string(), 5)]
//!     .into_iter()
//!     .collect();
//! let report = run_analysis(&config, &resolver, &peers, &[]).await?;
//! println!("{} clusters", report.clusters.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod app;
pub mod cluster;
pub mod config;
pub mod error_handling;
pub mod geo;
pub mod initialization;
pub mod recommend;
pub mod run;
pub mod sources;

// Re-export public API
pub use cluster::{cluster, overall_centroid, weighted_points, Cluster, PeerCounts, WeightedPoint};
pub use config::{ClusterConfig, Config, LogFormat, LogLevel, ResolverConfig, ScoringConfig};
pub use error_handling::{InitializationError, InputError, ProviderError};
pub use geo::{AddressResolver, Coordinate, GeoProvider, ProviderKind, Resolutions};
pub use recommend::{recommend, CandidateServer, Recommendation};
pub use run::{run_analysis, AnalysisReport};
