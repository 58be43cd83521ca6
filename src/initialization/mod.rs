//! Application initialization and resource setup.
//!
//! Logger and shared HTTP client construction. Both return typed errors so
//! `main` can report what failed.

mod client;
mod logger;

pub use client::init_client;
pub use logger::init_logger_with;
