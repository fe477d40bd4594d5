/// Database connection pool and download record queries.
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use crate::errors::{StoreError, StoreResult};
use crate::models::{DownloadRecord, ProgressState};

/// Create SQLite connection pool with WAL mode and busy timeout.
pub async fn create_pool(database_url: &str) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Connected to database: {}", database_url);
    Ok(pool)
}

/// Run migrations from the migrations directory.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Database migrations completed");
    Ok(())
}

fn to_db_int(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Overflow(value))
}

/// Insert or update the in-progress record for `filename`.
///
/// An existing row keeps its id; `done` is always reset to false.
pub async fn upsert_progress(
    pool: &SqlitePool,
    filename: &str,
    source_url: &str,
    local_path: &str,
    state: &ProgressState,
) -> StoreResult<()> {
    let total = state.total.map(to_db_int).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO downloads
            (id, filename, source_url, local_path, received_bytes, total_bytes, percent, done)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0)
        ON CONFLICT(filename) DO UPDATE SET
            source_url = excluded.source_url,
            local_path = excluded.local_path,
            received_bytes = excluded.received_bytes,
            total_bytes = excluded.total_bytes,
            percent = excluded.percent,
            done = 0,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(filename)
    .bind(source_url)
    .bind(local_path)
    .bind(to_db_int(state.received)?)
    .bind(total)
    .bind(state.percent.map(i64::from))
    .execute(pool)
    .await?;

    debug!(
        "Progress for {}: {} / {:?} bytes",
        filename, state.received, state.total
    );
    Ok(())
}

/// Mark the record for `filename` as done with `size` bytes received and total.
///
/// Creates the record when no progress tick was ever persisted for it.
pub async fn finalize(
    pool: &SqlitePool,
    filename: &str,
    source_url: &str,
    local_path: &str,
    size: u64,
) -> StoreResult<DownloadRecord> {
    let size = to_db_int(size)?;

    let record = sqlx::query_as::<_, DownloadRecord>(
        r#"
        INSERT INTO downloads
            (id, filename, source_url, local_path, received_bytes, total_bytes, percent, done)
        VALUES (?, ?, ?, ?, ?, ?, 100, 1)
        ON CONFLICT(filename) DO UPDATE SET
            source_url = excluded.source_url,
            local_path = excluded.local_path,
            received_bytes = excluded.received_bytes,
            total_bytes = excluded.total_bytes,
            percent = 100,
            done = 1,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(filename)
    .bind(source_url)
    .bind(local_path)
    .bind(size)
    .bind(size)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Get a single record by its filename key.
pub async fn get_by_filename(
    pool: &SqlitePool,
    filename: &str,
) -> StoreResult<Option<DownloadRecord>> {
    let record = sqlx::query_as::<_, DownloadRecord>("SELECT * FROM downloads WHERE filename = ?")
        .bind(filename)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Get every record, most recently updated first.
pub async fn list_downloads(pool: &SqlitePool) -> StoreResult<Vec<DownloadRecord>> {
    let records = sqlx::query_as::<_, DownloadRecord>(
        "SELECT * FROM downloads ORDER BY updated_at DESC, filename ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Delete every completed record. Returns the number removed.
pub async fn remove_all_completed(pool: &SqlitePool) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM downloads WHERE done = 1")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete one record by id. Returns 0 or 1.
pub async fn remove_download(pool: &SqlitePool, id: &str) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM downloads WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn tick(pool: &SqlitePool, filename: &str, received: u64, total: Option<u64>) {
        let path = format!("downloads/{}", filename);
        let url = format!("http://example.com/{}", filename);
        upsert_progress(pool, filename, &url, &path, &ProgressState::new(received, total))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        tick(&pool, "a.zip", 10, Some(100)).await;
        let first = get_by_filename(&pool, "a.zip").await.unwrap().unwrap();
        tick(&pool, "a.zip", 60, Some(100)).await;
        let second = get_by_filename(&pool, "a.zip").await.unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.received_bytes, 60);
        assert_eq!(second.percent, Some(60));
        assert!(!second.done);
        assert_eq!(list_downloads(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_total_stored_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        tick(&pool, "stream.bin", 42, None).await;
        let rec = get_by_filename(&pool, "stream.bin").await.unwrap().unwrap();
        assert_eq!(rec.total_bytes, None);
        assert_eq!(rec.percent, None);
    }

    #[tokio::test]
    async fn test_finalize_without_ticks_creates_record() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let rec = finalize(&pool, "small.txt", "http://example.com/small.txt", "downloads/small.txt", 17)
            .await
            .unwrap();
        assert!(rec.done);
        assert_eq!(rec.received_bytes, 17);
        assert_eq!(rec.total_bytes, Some(17));
        assert_eq!(rec.percent, Some(100));
    }

    #[tokio::test]
    async fn test_finalize_updates_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        tick(&pool, "a.zip", 10, None).await;
        let before = get_by_filename(&pool, "a.zip").await.unwrap().unwrap();
        let after = finalize(&pool, "a.zip", "http://example.com/a.zip", "downloads/a.zip", 90)
            .await
            .unwrap();

        assert_eq!(before.id, after.id);
        assert!(after.done);
        assert_eq!(after.total_bytes, Some(90));
    }

    #[tokio::test]
    async fn test_remove_all_completed_leaves_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        tick(&pool, "partial.iso", 5, Some(10)).await;
        finalize(&pool, "a.zip", "http://example.com/a.zip", "downloads/a.zip", 1).await.unwrap();
        finalize(&pool, "b.zip", "http://example.com/b.zip", "downloads/b.zip", 2).await.unwrap();

        assert_eq!(remove_all_completed(&pool).await.unwrap(), 2);

        let left = list_downloads(&pool).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].filename, "partial.iso");
        assert!(!left[0].done);
    }

    #[tokio::test]
    async fn test_remove_download_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let a = finalize(&pool, "a.zip", "http://example.com/a.zip", "downloads/a.zip", 1).await.unwrap();
        finalize(&pool, "b.zip", "http://example.com/b.zip", "downloads/b.zip", 2).await.unwrap();

        assert_eq!(remove_download(&pool, &a.id).await.unwrap(), 1);
        assert_eq!(remove_download(&pool, &a.id).await.unwrap(), 0);
        assert_eq!(remove_download(&pool, "no-such-id").await.unwrap(), 0);

        let left = list_downloads(&pool).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].filename, "b.zip");
    }

    #[tokio::test]
    async fn test_overflowing_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let err = finalize(&pool, "huge", "http://example.com/huge", "downloads/huge", u64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Overflow(_)));
    }
}
