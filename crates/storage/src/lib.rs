use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{domain::AnalysisId, protocol::AnalysisRecord};

/// Newest-first history is capped at this many records.
pub const HISTORY_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_analyses_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_analyses_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id                TEXT PRIMARY KEY,
                filename          TEXT NOT NULL,
                image_base64      TEXT NOT NULL,
                analysis          TEXT NOT NULL,
                objects_detected  TEXT NOT NULL DEFAULT '[]',
                text_found        TEXT NOT NULL DEFAULT '',
                emotions          TEXT NOT NULL DEFAULT '[]',
                scene_description TEXT NOT NULL DEFAULT '',
                confidence        TEXT NOT NULL DEFAULT '',
                timestamp         TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure analyses table exists")?;
        Ok(())
    }

    pub async fn insert_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO analyses (id, filename, image_base64, analysis, objects_detected, text_found, emotions, scene_description, confidence, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.filename)
        .bind(&record.image_base64)
        .bind(&record.analysis)
        .bind(serde_json::to_string(&record.objects_detected)?)
        .bind(&record.text_found)
        .bind(serde_json::to_string(&record.emotions)?)
        .bind(&record.scene_description)
        .bind(&record.confidence)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest first, at most `HISTORY_LIMIT` records.
    pub async fn list_recent_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            "SELECT id, filename, image_base64, analysis, objects_detected, text_found, emotions, scene_description, confidence, timestamp
             FROM analyses
             ORDER BY timestamp DESC
             LIMIT ?",
        )
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    pub async fn load_analysis(&self, id: AnalysisId) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(
            "SELECT id, filename, image_base64, analysis, objects_detected, text_found, emotions, scene_description, confidence, timestamp
             FROM analyses
             WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    pub async fn delete_analysis(&self, id: AnalysisId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn record_from_row(r: sqlx::sqlite::SqliteRow) -> Result<AnalysisRecord> {
    let id = AnalysisId::from_str(&r.get::<String, _>(0))
        .context("analyses table holds a malformed id")?;
    Ok(AnalysisRecord {
        id,
        filename: r.get::<String, _>(1),
        image_base64: r.get::<String, _>(2),
        analysis: r.get::<String, _>(3),
        objects_detected: serde_json::from_str(&r.get::<String, _>(4)).unwrap_or_default(),
        text_found: r.get::<String, _>(5),
        emotions: serde_json::from_str(&r.get::<String, _>(6)).unwrap_or_default(),
        scene_description: r.get::<String, _>(7),
        confidence: r.get::<String, _>(8),
        timestamp: r.get::<DateTime<Utc>, _>(9),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
