/// Single-file download engine.
///
/// Streams a URL into the download directory, persists throttled progress
/// ticks to the record store, and finalizes the record from the size of the
/// file on disk once the body has been fully written.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use fetchkeep_shared::db;
use fetchkeep_shared::models::{DownloadRecord, ProgressState};
use fetchkeep_shared::SqlitePool;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, DownloadResult};
use crate::filename::filename_from_url;
use crate::progress::ProgressTracker;

/// Download manager over one shared store handle.
///
/// Cloning is cheap; clones share the pool and HTTP client. Every `download`
/// call keeps its own attempt counter, so concurrent downloads never consume
/// each other's retries.
#[derive(Clone)]
pub struct Downloader {
    pool: SqlitePool,
    client: reqwest::Client,
    config: Arc<DownloaderConfig>,
}

/// Names a single download shares between attempts.
struct Target<'a> {
    url: &'a str,
    filename: &'a str,
    local_path: &'a Path,
    local_path_str: &'a str,
}

impl Downloader {
    pub fn new(pool: SqlitePool, config: DownloaderConfig) -> Self {
        Self::with_client(pool, reqwest::Client::new(), config)
    }

    pub fn with_client(pool: SqlitePool, client: reqwest::Client, config: DownloaderConfig) -> Self {
        Self {
            pool,
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Download `url` into the download directory and return the finished record.
    ///
    /// Transport errors are retried immediately until `max_attempts` attempts
    /// have been made. Each attempt truncates and rewrites the destination.
    pub async fn download(&self, url: &str) -> DownloadResult<DownloadRecord> {
        let filename = filename_from_url(url)?;
        let local_path = self.config.local_path(&filename);
        let local_path_str = local_path.display().to_string();
        let target = Target {
            url,
            filename: &filename,
            local_path: &local_path,
            local_path_str: &local_path_str,
        };

        info!("[Downloading {}] from {}", filename, url);

        let max_attempts = self.config.max_attempts.max(1);
        let mut tracker = ProgressTracker::new(self.config.progress_delay, self.config.progress_throttle);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.fetch_once(&target, &mut tracker).await {
                Ok(received) => {
                    debug!("Attempt {} for {} streamed {} bytes", attempt, filename, received);
                    break;
                }
                Err(e) if e.is_retriable() => {
                    if attempt >= max_attempts {
                        error!(
                            "[Failed to download {} after {} attempts]: {}",
                            filename, attempt, e
                        );
                        let DownloadError::Transport(last) = e else {
                            return Err(e);
                        };
                        return Err(DownloadError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last,
                        });
                    }
                    warn!(
                        "Attempt {}/{} for {} failed, retrying: {}",
                        attempt, max_attempts, filename, e
                    );
                }
                Err(e) => {
                    error!("[Error downloading {}]: {}", filename, e);
                    return Err(e);
                }
            }
        }

        let size = tokio::fs::metadata(&local_path).await?.len();
        let record = db::finalize(&self.pool, &filename, url, &local_path_str, size).await?;

        info!("[Finished {}] {} bytes", filename, size);
        Ok(record)
    }

    /// One GET of the target, written to disk. Returns bytes received.
    async fn fetch_once(
        &self,
        target: &Target<'_>,
        tracker: &mut ProgressTracker,
    ) -> DownloadResult<u64> {
        let response = self.client.get(target.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: target.url.to_string(),
                status: status.as_u16(),
            });
        }

        tracker.start_attempt(response.content_length(), Instant::now());

        let mut file = File::create(target.local_path).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;

            if let Some(state) = tracker.advance(chunk.len() as u64, Instant::now()) {
                self.persist_tick(target, &state).await;
            }
        }

        file.flush().await?;
        Ok(tracker.received())
    }

    /// Store a progress tick. A lost tick is superseded by the next one or by
    /// finalization, so failures here are only logged.
    async fn persist_tick(&self, target: &Target<'_>, state: &ProgressState) {
        let result = db::upsert_progress(
            &self.pool,
            target.filename,
            target.url,
            target.local_path_str,
            state,
        )
        .await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_busy() => {
                debug!("Store busy, skipped progress tick for {}: {}", target.filename, e);
            }
            Err(e) => {
                warn!("Failed upsert during progress for {}: {}", target.filename, e);
            }
        }
    }

    /// All persisted download records, unfiltered.
    pub async fn update_download_list(&self) -> DownloadResult<Vec<DownloadRecord>> {
        let records = db::list_downloads(&self.pool).await.map_err(|e| {
            error!("[Error retrieving file list]: {}", e);
            e
        })?;
        Ok(records)
    }

    /// Delete every completed record. Returns how many were removed.
    pub async fn remove_all_completed(&self) -> DownloadResult<u64> {
        let removed = db::remove_all_completed(&self.pool).await.map_err(|e| {
            error!("[Error removing completed downloads]: {}", e);
            e
        })?;
        info!("Removed {} completed downloads", removed);
        Ok(removed)
    }

    /// Delete the record with `id`. Returns 1 if it existed, 0 otherwise.
    pub async fn remove_completed(&self, id: &str) -> DownloadResult<u64> {
        let removed = db::remove_download(&self.pool, id).await.map_err(|e| {
            error!("[Error removing download {}]: {}", id, e);
            e
        })?;
        if removed == 0 {
            debug!("No download with id {}", id);
        }
        Ok(removed)
    }

    /// The record stored for `filename`, if any.
    pub async fn find_download(&self, filename: &str) -> DownloadResult<Option<DownloadRecord>> {
        Ok(db::get_by_filename(&self.pool, filename).await?)
    }
}
