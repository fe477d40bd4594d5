//! Fetchkeep download engine.
//!
//! Streams a single URL to disk and keeps a persisted progress record per
//! destination file:
//! - throttled progress ticks while the body streams
//! - finalization from the size written to disk
//! - immediate retries on transport errors, scoped to each call
pub mod config;
pub mod downloader;
pub mod error;
pub mod filename;
pub mod progress;

pub use config::DownloaderConfig;
pub use downloader::Downloader;
pub use error::{DownloadError, DownloadResult};
pub use fetchkeep_shared::models::DownloadRecord;
