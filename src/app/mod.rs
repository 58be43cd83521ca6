//! Application-facing helpers: progress logging, the terminal report and
//! Ctrl-C handling used by the CLI.

pub mod progress;
pub mod report;
pub mod shutdown;

// Re-export public API
pub use progress::LogProgress;
pub use report::{export_json, format_distance, print_report};
pub use shutdown::cancel_on_ctrl_c;
