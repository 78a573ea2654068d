use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

const MAX_LOG_SIZE: u64 = 1024 * 1024; // 1MB
const LOG_FILE_NAME: &str = "jsharness.log";

/// Initialize logging for the harness.
///
/// Console output goes to stderr so it never interleaves with what scripts
/// `print`. `RUST_LOG` overrides the level picked from `verbosity`.
///
/// Returns a guard that must be kept alive for the duration of the program
/// when file logging is enabled.
pub fn init_logging(verbosity: u8, to_file: bool) -> io::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let log_dir = config::data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Failed to find home directory"))?
        .join("logs");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join(LOG_FILE_NAME);
    truncate_if_needed(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("Logging to file: {}", log_path.display());
    Ok(Some(guard))
}

fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Truncate the log file if it exceeds MAX_LOG_SIZE.
fn truncate_if_needed(log_path: &Path) -> io::Result<()> {
    if log_path.exists() && fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        File::create(log_path)?.set_len(0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_debug_flag_raises_level() {
        assert_eq!(default_level(0), "warn");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(4), "trace");
    }

    #[test]
    fn test_truncates_only_oversized_logs() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let small = dir.path().join("small.log");
        let large = dir.path().join("large.log");
        fs::write(&small, "keep me").expect("Failed to write log");
        fs::write(&large, vec![b'x'; MAX_LOG_SIZE as usize + 1]).expect("Failed to write log");

        truncate_if_needed(&small).expect("truncate small");
        truncate_if_needed(&large).expect("truncate large");
        truncate_if_needed(&dir.path().join("absent.log")).expect("absent is fine");

        assert_eq!(fs::read_to_string(&small).expect("read"), "keep me");
        assert_eq!(fs::metadata(&large).expect("metadata").len(), 0);
    }
}
