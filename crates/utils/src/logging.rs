//! Tracing setup shared by the ParentJourney binaries.
//!
//! Console output is always on. JSON file output is opt-in:
//!
//! - `PJ_FILE_LOGGING`: "true" or "1" enables daily rolling log files
//! - `PJ_LOG_DIR`: log directory (default `./logs`)
//! - `PJ_LOG_MAX_FILES`: number of daily files to keep (default: 7)

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "parent-journey.log";

#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    pub max_files: usize,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        let enabled = std::env::var("PJ_FILE_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_dir = std::env::var("PJ_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));

        let max_files = std::env::var("PJ_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(7);

        Self {
            enabled,
            log_dir,
            max_files,
        }
    }
}

/// Builds the filter directive for our crates at `log_level`, everything else at warn.
pub fn filter_directive(log_level: &str) -> String {
    format!(
        "warn,server={level},utils={level},tower_http={level}",
        level = log_level
    )
}

/// Initialize the global subscriber.
///
/// The returned guard must live as long as the process, otherwise buffered
/// file output is lost. Returns `None` when file logging is off.
pub fn init_logging(log_level: &str) -> Option<WorkerGuard> {
    let config = FileLoggingConfig::default();
    let directive = filter_directive(log_level);
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer().with_filter(env_filter.clone());

    if !config.enabled {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", config.log_dir, e);
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = ?config.log_dir,
        max_files = config.max_files,
        "File logging enabled"
    );

    let log_dir = config.log_dir.clone();
    let max_files = config.max_files;
    std::thread::spawn(move || {
        cleanup_old_logs(&log_dir, max_files);
    });

    Some(guard)
}

/// Remove rotated log files beyond the newest `max_files`. Returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> usize {
    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(LOG_FILE_PREFIX))
                .unwrap_or(false)
        })
        .filter_map(|e| {
            e.metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| (e.path(), t))
        })
        .collect();

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.into_iter().skip(max_files) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_filter_directive_scopes_our_crates() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("server=debug"));
        assert!(directive.contains("utils=debug"));
    }

    #[test]
    #[serial]
    fn test_default_config_disabled_without_env() {
        // SAFETY: serialised with other env-mutating tests.
        unsafe { std::env::remove_var("PJ_FILE_LOGGING") };
        let config = FileLoggingConfig::default();
        assert!(!config.enabled);
        assert!(config.max_files > 0);
    }

    #[test]
    fn test_cleanup_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=4 {
            let path = dir.path().join(format!("{LOG_FILE_PREFIX}.2026-01-0{day}"));
            std::fs::write(&path, "x").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        std::fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        let removed = cleanup_old_logs(dir.path(), 2);
        assert_eq!(removed, 2);

        let remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.contains(&"unrelated.txt".to_string()));
        assert!(remaining.contains(&format!("{LOG_FILE_PREFIX}.2026-01-04")));
    }
}
