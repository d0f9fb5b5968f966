//! Tracing setup for hosts embedding the aggregator.
//!
//! The library itself only emits `tracing` events. A host with its own
//! subscriber can ignore this module entirely; one without can call
//! [`init_logging`] once at startup. All switches come from the
//! environment so embedding UIs need no config surface of their own.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Logging switches resolved from `PROMPTRIG_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Master switch; `PROMPTRIG_LOG=off` (or `0`/`false`/`no`) disables
    /// subscriber installation entirely.
    pub enabled: bool,
    /// Filter directives, from `PROMPTRIG_LOG_LEVEL`, falling back to
    /// `RUST_LOG`, then `info`.
    pub filter: String,
    /// When `PROMPTRIG_JSON_LOG_PATH` is set, events go to that file as
    /// JSON lines instead of compact text on stderr.
    pub json_log_path: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    fn resolve(var: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = var("PROMPTRIG_LOG")
            .map(|value| {
                !matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off" | "no"
                )
            })
            .unwrap_or(true);
        let filter = var("PROMPTRIG_LOG_LEVEL")
            .or_else(|| var("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());
        let json_log_path = var("PROMPTRIG_JSON_LOG_PATH").map(PathBuf::from);
        Self {
            enabled,
            filter,
            json_log_path,
        }
    }
}

/// Installs the process-wide subscriber once; later calls are no-ops.
///
/// Returns whether a subscriber is installed by this library (false when
/// disabled via `PROMPTRIG_LOG` or when the host already installed one).
pub fn init_logging() -> bool {
    *INSTALLED.get_or_init(|| {
        let config = LogConfig::from_env();
        if !config.enabled {
            return false;
        }
        install(&config)
    })
}

fn install(config: &LogConfig) -> bool {
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.json_log_path {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let _ = std::fs::create_dir_all(dir);
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("promptrig.log.jsonl");
            let writer = tracing_appender::rolling::never(dir, file_name);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .is_ok()
        }
        None => {
            // stderr, not stdout: an interactive host owns stdout.
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
                .is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_to_info_on_stderr() {
        let config = LogConfig::resolve(|_| None);
        assert!(config.enabled);
        assert_eq!(config.filter, "info");
        assert_eq!(config.json_log_path, None);
    }

    #[test]
    fn resolve_reads_the_promptrig_switches() {
        let config = LogConfig::resolve(|key| match key {
            "PROMPTRIG_LOG" => Some("off".into()),
            "PROMPTRIG_LOG_LEVEL" => Some("promptrig_core=debug".into()),
            "PROMPTRIG_JSON_LOG_PATH" => Some("/tmp/rig/logs.jsonl".into()),
            _ => None,
        });
        assert!(!config.enabled);
        assert_eq!(config.filter, "promptrig_core=debug");
        assert_eq!(config.json_log_path, Some(PathBuf::from("/tmp/rig/logs.jsonl")));
    }

    #[test]
    fn rust_log_is_the_fallback_filter() {
        let config = LogConfig::resolve(|key| (key == "RUST_LOG").then(|| "warn".to_string()));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn repeated_init_settles_on_one_answer() {
        assert_eq!(init_logging(), init_logging());
    }
}
