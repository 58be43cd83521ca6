//! Logger setup.
//!
//! Everything the crate reports goes through the `log` facade; this installs
//! the `env_logger` backend in either a colored console layout or one JSON
//! object per line.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Installs the global logger.
///
/// `RUST_LOG` is honored for per-target directives, but `level` always wins
/// for the crate itself. HTTP internals stay at `info` so a `debug` run shows
/// resolver decisions rather than connection pool chatter.
///
/// # Errors
///
/// `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Trace provider calls only
/// RUST_LOG=peer_cluster::geo=debug peer_cluster --peers-file peers.json
///
/// # Machine-readable output for a log shipper
/// peer_cluster --peers-file peers.json --log-format json 2> run.jsonl
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    // httptest's embedded server is chatty at debug
    builder.filter_module("httptest", LevelFilter::Warn);
    builder.filter_module("peer_cluster", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = json_line(
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{}", line)
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let (badge, level) = level_badge(record.level());
                writeln!(
                    buf,
                    "{} {} [{}] {}",
                    badge,
                    record.target().cyan(),
                    level,
                    record.args()
                )
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)
}

fn level_badge(level: log::Level) -> (&'static str, ColoredString) {
    let name = level.as_str();
    match level {
        log::Level::Error => ("❌", name.red()),
        log::Level::Warn => ("⚠️", name.yellow()),
        log::Level::Info => ("✔️", name.green()),
        log::Level::Debug => ("🔍", name.blue()),
        log::Level::Trace => ("🔬", name.purple()),
    }
}

/// One JSON log record: `ts` (epoch millis), `level`, `target`, `msg`.
fn json_line(ts: i64, level: log::Level, target: &str, message: &str) -> String {
    serde_json::json!({
        "ts": ts,
        "level": level.as_str(),
        "target": target,
        "msg": message,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_line_escapes_message() {
        let line = json_line(
            1_700_000_000_000,
            log::Level::Warn,
            "peer_cluster::geo",
            "bad \"data\"\n",
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["ts"], 1_700_000_000_000_i64);
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["target"], "peer_cluster::geo");
        assert_eq!(value["msg"], "bad \"data\"\n");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_second_init_reports_error() {
        // env_logger can only be installed once per process
        let _ = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        let result = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(matches!(result, Err(InitializationError::LoggerError(_))));
    }
}
