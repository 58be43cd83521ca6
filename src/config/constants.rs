//! Configuration constants.
//!
//! This module defines the defaults used throughout the application: resolver
//! timing and budgets, clustering parameters, scoring weights and the
//! locations of external data sources.

use std::time::Duration;

// Resolution cache
/// Time-to-live for every cached resolution outcome (positive or negative)
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Maximum number of addresses held in the resolution cache
pub const CACHE_CAPACITY: usize = 1000;
/// Cache key under which the caller's own public location is stored.
/// Not a valid IP address, so it can never collide with a peer.
pub const SELF_CACHE_KEY: &str = "@self";

// Primary provider budget
/// Maximum addresses submitted in one bulk call (ip-api batch endpoint limit)
pub const PRIMARY_BATCH_LIMIT: usize = 100;
/// Bulk calls admitted per rolling rate window
/// ip-api allows 15 batch requests per minute on the free tier
pub const RATE_LIMIT_CALLS: usize = 15;
/// Length of the rolling rate window
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

// Fallback providers
/// Concurrent single-address fallback lookups
pub const FALLBACK_CONCURRENCY: usize = 4;

// Network operation timeouts
/// Per-call provider timeout in seconds
pub const PROVIDER_TIMEOUT_SECS: u64 = 5;
/// Delay before the single retry of a transient provider failure
pub const RETRY_DELAY_MS: u64 = 500;

// Clustering
/// Default number of peer clusters
pub const DEFAULT_CLUSTERS: usize = 5;
/// Default k-means seed
pub const DEFAULT_SEED: u64 = 42;
/// Independent k-means restarts; the lowest-inertia run wins
pub const KMEANS_RESTARTS: usize = 10;
/// Lloyd iteration cap per restart
pub const KMEANS_MAX_ITERATIONS: usize = 300;
/// Centroid movement (degrees) below which a run is considered converged
pub const KMEANS_TOLERANCE: f64 = 1e-9;

// Scoring
/// Added to every distance so a co-located candidate never divides by zero
pub const SCORE_EPSILON_KM: f64 = 1.0;
/// Load penalty weight (alpha). Below 1.0 so a near, loaded candidate can still win
pub const DEFAULT_LOAD_PENALTY: f64 = 0.5;
/// Weight of the cluster→reference→candidate detour in the blended distance
pub const DEFAULT_REFERENCE_WEIGHT: f64 = 0.1;
/// Recommendations returned per cluster
pub const DEFAULT_TOP_N: usize = 1;
/// Mean Earth radius used by the great-circle distance
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

// External sources
/// Default candidate server list (ProtonVPN-style JSON)
pub const DEFAULT_SERVERS_URL: &str =
    "https://raw.githubusercontent.com/Huzky/protonvpn-servers/main/servers.json";
/// Default qBittorrent Web UI address
pub const DEFAULT_QBITTORRENT_URL: &str = "http://localhost:8080";
/// Capability a candidate must advertise to be recommended
pub const DEFAULT_CAPABILITY: &str = "p2p";
/// Concurrent per-torrent peer list requests against qBittorrent
pub const PEER_FETCH_CONCURRENCY: usize = 4;

// Provider endpoints
pub const IP_API_BASE_URL: &str = "http://ip-api.com";
pub const IPWHOIS_BASE_URL: &str = "https://ipwho.is";
pub const IPINFO_BASE_URL: &str = "https://ipinfo.io";

/// Progress is logged every this many resolved addresses
pub const LOGGING_INTERVAL: usize = 50;

/// Default User-Agent for provider and source requests
pub const DEFAULT_USER_AGENT: &str = concat!("peer_cluster/", env!("CARGO_PKG_VERSION"));

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
