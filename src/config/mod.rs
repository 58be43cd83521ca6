//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, budgets, scoring weights, etc.)
//! - CLI option types and parsing
//! - Per-component configuration for the resolver, clusterer and scorer

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    ClusterConfig, Config, LogFormat, LogLevel, ResolverConfig, ScoringConfig,
};
