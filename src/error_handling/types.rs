//! Error type definitions.
//!
//! This module defines the error types used at the library's seams.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Invalid input rejected synchronously at an operation's entry.
///
/// These are programming or configuration errors, never runtime conditions,
/// and are not retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// The string is not an IPv4 or IPv6 address.
    #[error("Invalid network address: {0:?}")]
    InvalidAddress(String),

    /// The requested cluster count was zero.
    #[error("Cluster count must be a positive integer, got {0}")]
    InvalidClusterCount(usize),

    /// A peer count of zero was supplied for an address.
    #[error("Weight for {address} must be a positive integer, got {weight}")]
    InvalidWeight {
        /// Offending address
        address: String,
        /// Offending weight
        weight: u32,
    },

    /// Latitude or longitude outside the valid range (or not finite).
    #[error("Coordinate out of range: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate {
        /// Offending latitude
        latitude: f64,
        /// Offending longitude
        longitude: f64,
    },

    /// Candidate load outside [0, 1].
    #[error("Load for server {server} must be within [0, 1], got {load}")]
    InvalidLoad {
        /// Server identifier
        server: String,
        /// Offending load
        load: f64,
    },

    /// A configuration parameter outside its allowed range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Failure of a single geolocation provider call.
///
/// Provider errors never escape the resolver: they are logged and converted
/// into unresolved (`None`) results.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-level failure (connect, request, body).
    #[error("Transport error: {0}")]
    Transport(#[source] ReqwestError),

    /// The call exceeded its time bound.
    #[error("Provider call timed out")]
    Timeout,

    /// The provider answered with a non-success HTTP status.
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    /// The payload could not be understood.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// The resolver was cancelled before the call could start.
    #[error("Cancelled before the call started")]
    Cancelled,
}

impl From<ReqwestError> for ProviderError {
    fn from(error: ReqwestError) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = error.status() {
            ProviderError::Status(status.as_u16())
        } else if error.is_decode() {
            ProviderError::Malformed(error.to_string())
        } else {
            ProviderError::Transport(error)
        }
    }
}
