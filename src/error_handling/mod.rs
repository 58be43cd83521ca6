//! Error handling.
//!
//! This module provides:
//! - Error type definitions for initialization, invalid input and provider calls
//! - Retry classification for provider failures
//!
//! Errors are categorized into:
//! - **Input errors**: rejected synchronously, fatal to the call
//! - **Provider errors**: absorbed by the resolver, retried once when transient
//! - **Initialization errors**: logger and HTTP client setup

mod retry;
mod types;

// Re-export public API
pub(crate) use retry::retry_once;
pub use types::{InitializationError, InputError, ProviderError};
