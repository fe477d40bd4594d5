/// Runtime configuration, read from the environment (and `.env` when present).
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads/";
pub const DEFAULT_DATABASE_PATH: &str = "db/data.db";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub download_dir: PathBuf,
    pub database_path: PathBuf,
    /// Minimum gap between two persisted progress ticks.
    pub progress_throttle: Duration,
    /// Quiet period after a response starts before the first tick.
    pub progress_delay: Duration,
    /// Total attempts per download, first one included.
    pub max_attempts: u32,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            progress_throttle: Duration::from_millis(2000),
            progress_delay: Duration::from_millis(1000),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

impl DownloaderConfig {
    /// Read configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let download_dir = std::env::var("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);
        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let max_attempts: u32 = std::env::var("MAX_DOWNLOAD_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_attempts);

        Self {
            download_dir,
            database_path,
            progress_throttle: env_millis("PROGRESS_THROTTLE_MS", defaults.progress_throttle),
            progress_delay: env_millis("PROGRESS_DELAY_MS", defaults.progress_delay),
            max_attempts,
        }
    }

    /// Create the download directory and the database's parent directory.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.download_dir)?;
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Download directory: {}", self.download_dir.display());
        Ok(())
    }

    /// SQLite connection URL for the configured database file.
    pub fn database_url(&self) -> String {
        let path = self.database_path.display().to_string();
        // Strip Windows UNC prefix (\\?\) which breaks SQLite URL parsing
        let path = path.strip_prefix(r"\\?\").unwrap_or(&path);
        format!("sqlite://{}?mode=rwc", path)
    }

    /// Where a file named `filename` is written.
    pub fn local_path(&self, filename: &str) -> PathBuf {
        Path::new(&self.download_dir).join(filename)
    }
}
