//! Configuration types and CLI options.
//!
//! `Config` is the command-line surface; the resolver, clusterer and scorer
//! each consume a smaller typed configuration derived from it.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;
use crate::error_handling::InputError;
use crate::geo::ProviderKind;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line options and configuration.
///
/// # Examples
///
/// ```bash
/// # Peers from qBittorrent, password from .env or the environment
/// QBT_PASSWORD=secret peer_cluster --clusters 3
///
/// # Offline run from files
/// peer_cluster --peers-file peers.json --servers-file servers.json --json-output report.json
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "peer_cluster",
    about = "Clusters torrent peers by location and recommends the nearest suitable server per cluster."
)]
pub struct Config {
    /// Read `{address: count}` peers from a JSON file instead of qBittorrent
    #[arg(long, value_parser)]
    pub peers_file: Option<PathBuf>,

    /// qBittorrent Web UI base URL
    #[arg(long, default_value = DEFAULT_QBITTORRENT_URL)]
    pub qbt_url: String,

    /// qBittorrent Web UI username
    #[arg(long, default_value = "admin")]
    pub qbt_username: String,

    /// qBittorrent Web UI password
    #[arg(long, env = "QBT_PASSWORD", hide_env_values = true)]
    pub qbt_password: Option<String>,

    /// Read candidate servers from a local JSON file
    #[arg(long, value_parser)]
    pub servers_file: Option<PathBuf>,

    /// Candidate server list URL (ignored when --servers-file is given)
    #[arg(long, default_value = DEFAULT_SERVERS_URL)]
    pub servers_url: String,

    /// Capability a server must advertise to be recommended
    #[arg(long, default_value = DEFAULT_CAPABILITY)]
    pub capability: String,

    /// Number of peer clusters
    #[arg(long, default_value_t = DEFAULT_CLUSTERS)]
    pub clusters: usize,

    /// Seed for cluster initialisation
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Recommendations per cluster
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Do not bias recommendations toward this machine's own location
    #[arg(long)]
    pub no_reference: bool,

    /// Load penalty weight in [0, 1]
    #[arg(long, default_value_t = DEFAULT_LOAD_PENALTY)]
    pub load_penalty: f64,

    /// Weight of the detour through this machine's location in [0, 1]
    #[arg(long, default_value_t = DEFAULT_REFERENCE_WEIGHT)]
    pub reference_weight: f64,

    /// Bulk-capable primary geolocation provider
    #[arg(long, value_enum, default_value_t = ProviderKind::IpApi)]
    pub primary_provider: ProviderKind,

    /// Fallback providers, tried in order for addresses the primary missed
    #[arg(
        long = "fallback-provider",
        value_enum,
        default_values_t = [ProviderKind::IpWhoIs, ProviderKind::IpInfo]
    )]
    pub fallback_providers: Vec<ProviderKind>,

    /// Primary provider calls admitted per minute
    #[arg(long, default_value_t = RATE_LIMIT_CALLS)]
    pub rate_limit_calls: usize,

    /// Concurrent fallback lookups
    #[arg(long, default_value_t = FALLBACK_CONCURRENCY)]
    pub fallback_concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = PROVIDER_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Persist the resolution cache to this JSON file between runs
    #[arg(long, value_parser)]
    pub cache_file: Option<PathBuf>,

    /// Also write the analysis report as JSON
    #[arg(long, value_parser)]
    pub json_output: Option<PathBuf>,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            peers_file: None,
            qbt_url: DEFAULT_QBITTORRENT_URL.to_string(),
            qbt_username: "admin".to_string(),
            qbt_password: None,
            servers_file: None,
            servers_url: DEFAULT_SERVERS_URL.to_string(),
            capability: DEFAULT_CAPABILITY.to_string(),
            clusters: DEFAULT_CLUSTERS,
            seed: DEFAULT_SEED,
            top_n: DEFAULT_TOP_N,
            no_reference: false,
            load_penalty: DEFAULT_LOAD_PENALTY,
            reference_weight: DEFAULT_REFERENCE_WEIGHT,
            primary_provider: ProviderKind::IpApi,
            fallback_providers: vec![ProviderKind::IpWhoIs, ProviderKind::IpInfo],
            rate_limit_calls: RATE_LIMIT_CALLS,
            fallback_concurrency: FALLBACK_CONCURRENCY,
            timeout_seconds: PROVIDER_TIMEOUT_SECS,
            cache_file: None,
            json_output: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

impl Config {
    /// Resolver settings implied by these options.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            rate_limit_calls: self.rate_limit_calls,
            fallback_concurrency: self.fallback_concurrency,
            request_timeout: Duration::from_secs(self.timeout_seconds),
            ..ResolverConfig::default()
        }
    }

    /// Clustering settings implied by these options.
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            clusters: self.clusters,
            seed: self.seed,
            ..ClusterConfig::default()
        }
    }

    /// Scoring settings implied by these options.
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            load_penalty: self.load_penalty,
            reference_weight: self.reference_weight,
            top_n: self.top_n,
            ..ScoringConfig::default()
        }
    }
}

/// Address resolver settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// TTL applied to every cache write
    pub cache_ttl: Duration,
    /// Maximum cached addresses
    pub cache_capacity: usize,
    /// Upper bound on addresses per primary call (further capped by the provider)
    pub batch_size: usize,
    /// Primary calls admitted per `rate_limit_window`
    pub rate_limit_calls: usize,
    /// Rolling window for the primary call budget
    pub rate_limit_window: Duration,
    /// Concurrent fallback lookups
    pub fallback_concurrency: usize,
    /// Bound on any single provider call
    pub request_timeout: Duration,
    /// Delay before retrying a transient provider failure
    pub retry_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: CACHE_TTL,
            cache_capacity: CACHE_CAPACITY,
            batch_size: PRIMARY_BATCH_LIMIT,
            rate_limit_calls: RATE_LIMIT_CALLS,
            rate_limit_window: RATE_LIMIT_WINDOW,
            fallback_concurrency: FALLBACK_CONCURRENCY,
            request_timeout: Duration::from_secs(PROVIDER_TIMEOUT_SECS),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl ResolverConfig {
    /// Rejects settings that would stall or disable the resolver.
    pub fn validate(&self) -> Result<(), InputError> {
        let checks = [
            ("cache_capacity", self.cache_capacity),
            ("batch_size", self.batch_size),
            ("rate_limit_calls", self.rate_limit_calls),
            ("fallback_concurrency", self.fallback_concurrency),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(InputError::InvalidParameter {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.request_timeout.is_zero() {
            return Err(InputError::InvalidParameter {
                name: "request_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Geo-clusterer settings.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Requested cluster count (k)
    pub clusters: usize,
    /// Seed for k-means++ initialisation
    pub seed: u64,
    /// Independent restarts
    pub restarts: usize,
    /// Lloyd iteration cap per restart
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            seed: DEFAULT_SEED,
            restarts: KMEANS_RESTARTS,
            max_iterations: KMEANS_MAX_ITERATIONS,
        }
    }
}

/// Recommendation scorer settings.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Alpha: how strongly load reduces a candidate's score
    pub load_penalty: f64,
    /// Beta: blend weight of the detour through the reference location
    pub reference_weight: f64,
    /// Epsilon added to every distance, in kilometres
    pub epsilon_km: f64,
    /// Candidates returned per cluster
    pub top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            load_penalty: DEFAULT_LOAD_PENALTY,
            reference_weight: DEFAULT_REFERENCE_WEIGHT,
            epsilon_km: SCORE_EPSILON_KM,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl ScoringConfig {
    /// Rejects weights outside [0, 1], a non-positive epsilon or `top_n == 0`.
    pub fn validate(&self) -> Result<(), InputError> {
        for (name, value) in [
            ("load_penalty", self.load_penalty),
            ("reference_weight", self.reference_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InputError::InvalidParameter {
                    name,
                    reason: format!("{} is outside [0, 1]", value),
                });
            }
        }
        if !(self.epsilon_km > 0.0 && self.epsilon_km.is_finite()) {
            return Err(InputError::InvalidParameter {
                name: "epsilon_km",
                reason: format!("{} is not a positive distance", self.epsilon_km),
            });
        }
        if self.top_n == 0 {
            return Err(InputError::InvalidParameter {
                name: "top_n",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
