use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "playcord.log";
const KEEP_DAYS: u64 = 7;
const DEFAULT_FILTER: &str = "info,playcord=debug,reqwest=warn,hyper=warn";

/// Console plus daily-rolling file logging. Keep the guard alive for the
/// lifetime of the process or buffered lines are lost.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: failed to create log directory: {e}");
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // stdout is reserved for command output.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        log_dir = %log_dir.display(),
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialized"
    );

    let removed = cleanup_old_logs(log_dir, KEEP_DAYS);
    if removed > 0 {
        tracing::debug!(removed, "Pruned old log files");
    }

    guard
}

/// Delete rotated log files last modified more than `keep_days` ago.
/// Returns how many were removed.
fn cleanup_old_logs(log_dir: &Path, keep_days: u64) -> usize {
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(keep_days * 24 * 60 * 60))
    else {
        return 0;
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read log directory for cleanup");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(LOG_FILE) && name != LOG_FILE => {}
            _ => continue,
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove old log file"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str, age_days: u64) {
        let file = File::create(dir.join(name)).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_days * 24 * 60 * 60);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_cleanup_removes_only_old_rotated_logs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "playcord.log.2020-01-01", 30);
        touch(dir.path(), "playcord.log.2020-01-02", 2);
        touch(dir.path(), "playcord.log", 30);
        touch(dir.path(), "notes.txt", 30);

        assert_eq!(cleanup_old_logs(dir.path(), 7), 1);
        assert!(!dir.path().join("playcord.log.2020-01-01").exists());
        assert!(dir.path().join("playcord.log.2020-01-02").exists());
        assert!(dir.path().join("playcord.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 7), 0);
    }
}
