//! SQLite library backend
//!
//! Opens the media library database directly, read-only. Used when the
//! library's query endpoint is unreachable.

use crate::library::{LibraryLookup, LocalFileFacts};
use async_trait::async_trait;
use smr_common::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Read-only view of the library's `scenes` table
pub struct SqliteLibrary {
    db: SqlitePool,
}

impl SqliteLibrary {
    /// Open the library database without write access
    pub async fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(smr_common::Error::NotFound(format!(
                "Library database {}",
                db_path.display()
            )));
        }

        let db_url = format!("sqlite://{}?mode=ro", db_path.display());
        tracing::debug!("Connecting to library database: {}", db_url);

        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await?;

        Ok(Self { db })
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LibraryLookup for SqliteLibrary {
    async fn file_facts(&self, local_id: &str) -> Result<Option<LocalFileFacts>> {
        let row: Option<(Option<i64>, Option<i64>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT CAST(size AS INTEGER), CAST(duration AS INTEGER), CAST(height AS TEXT)
            FROM scenes
            WHERE id = ?
            "#,
        )
        .bind(local_id)
        .fetch_optional(&self.db)
        .await?;

        let Some((size, duration, height)) = row else {
            tracing::debug!(local_id = %local_id, "Scene not found in library database");
            return Ok(None);
        };

        let facts = LocalFileFacts {
            duration_seconds: duration.and_then(|d| u64::try_from(d).ok()),
            file_size_bytes: size.and_then(|s| u64::try_from(s).ok()),
            quality_label: height.filter(|h| !h.trim().is_empty()),
        };

        tracing::debug!(
            local_id = %local_id,
            duration = ?facts.duration_seconds,
            size = ?facts.file_size_bytes,
            quality = ?facts.quality_label,
            "Loaded local file facts"
        );

        Ok(Some(facts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Create a library database file with a scenes table
    async fn setup_library(dir: &Path) -> PathBuf {
        let path = dir.join("library.sqlite");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url).await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE scenes (
                id INTEGER PRIMARY KEY,
                size INTEGER,
                duration REAL,
                height INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO scenes (id, size, duration, height) VALUES (12, 1000000000, 600.4, 1080)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO scenes (id, size, duration, height) VALUES (13, NULL, NULL, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        pool.close().await;
        path
    }

    #[tokio::test]
    async fn test_reads_facts_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = setup_library(dir.path()).await;
        let library = SqliteLibrary::open(&path).await.unwrap();

        let facts = library.file_facts("12").await.unwrap().unwrap();
        assert_eq!(facts.duration_seconds, Some(600));
        assert_eq!(facts.file_size_bytes, Some(1_000_000_000));
        assert_eq!(facts.quality_label.as_deref(), Some("1080"));
    }

    #[tokio::test]
    async fn test_missing_values_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = setup_library(dir.path()).await;
        let library = SqliteLibrary::open(&path).await.unwrap();

        assert_eq!(
            library.file_facts("13").await.unwrap(),
            Some(LocalFileFacts::default())
        );
        assert_eq!(library.file_facts("99").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let result = SqliteLibrary::open(Path::new("/nonexistent/library.sqlite")).await;
        assert!(matches!(result, Err(smr_common::Error::NotFound(_))));
    }
}
