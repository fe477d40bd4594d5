/// Record model shared by the store and the downloader.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted progress of one download, keyed by destination filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DownloadRecord {
    pub id: String,
    pub filename: String,
    pub source_url: String,
    pub local_path: String,
    pub received_bytes: i64,
    /// Unknown when the response carried no content length.
    pub total_bytes: Option<i64>,
    /// Unknown whenever `total_bytes` is.
    pub percent: Option<i64>,
    pub done: bool,
    pub updated_at: NaiveDateTime,
}

impl DownloadRecord {
    /// Lifecycle stage derived from the persisted fields.
    pub fn status(&self) -> DownloadStatus {
        if self.done {
            DownloadStatus::Done
        } else if self.received_bytes == 0 {
            DownloadStatus::Pending
        } else {
            DownloadStatus::InProgress
        }
    }
}

/// Download lifecycle: pending, then in progress (repeated ticks), then done.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    InProgress,
    Done,
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Pending => write!(f, "pending"),
            DownloadStatus::InProgress => write!(f, "in_progress"),
            DownloadStatus::Done => write!(f, "done"),
        }
    }
}

/// One progress tick reported while a body is streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub received: u64,
    pub total: Option<u64>,
    pub percent: Option<u8>,
}

impl ProgressState {
    /// Build a tick, deriving percent from `received / total` when total is known.
    pub fn new(received: u64, total: Option<u64>) -> Self {
        let percent = total.filter(|t| *t > 0).map(|t| {
            let pct = (u128::from(received) * 100) / u128::from(t);
            pct.min(100) as u8
        });
        Self { received, total, percent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(received: i64, done: bool) -> DownloadRecord {
        DownloadRecord {
            id: "r1".to_string(),
            filename: "a.zip".to_string(),
            source_url: "http://example.com/a.zip".to_string(),
            local_path: "downloads/a.zip".to_string(),
            received_bytes: received,
            total_bytes: None,
            percent: None,
            done,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_percent_from_total() {
        assert_eq!(ProgressState::new(50, Some(200)).percent, Some(25));
        assert_eq!(ProgressState::new(199, Some(200)).percent, Some(99));
    }

    #[test]
    fn test_percent_unknown_without_total() {
        assert_eq!(ProgressState::new(50, None).percent, None);
        assert_eq!(ProgressState::new(50, Some(0)).percent, None);
    }

    #[test]
    fn test_percent_capped() {
        // Servers occasionally send more than they announce.
        assert_eq!(ProgressState::new(300, Some(200)).percent, Some(100));
    }

    #[test]
    fn test_status() {
        assert_eq!(record(0, false).status(), DownloadStatus::Pending);
        assert_eq!(record(10, false).status(), DownloadStatus::InProgress);
        assert_eq!(record(10, true).status(), DownloadStatus::Done);
        assert_eq!(DownloadStatus::InProgress.to_string(), "in_progress");
    }
}
