//! SQLite-backed feedback store
//!
//! Rows are append-only: the store never updates or deletes feedback. Each
//! append is a single auto-committed INSERT, so concurrent page views are
//! serialised by SQLite's own locking.

use super::model::{is_blank, AppendOutcome, FeedbackEntry, Rating};
use crate::db::init::init_database;
use crate::time::{format_timestamp, now_seconds, parse_timestamp};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info, warn};

type FeedbackRow = (i64, String, String, String, String, Option<String>);

/// Handle to the feedback database
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
}

impl FeedbackStore {
    /// Open the store, creating the database and schema when needed
    ///
    /// Idempotent: a second call against the same file changes nothing.
    pub async fn initialize(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Record one piece of feedback
    ///
    /// Blank comments are skipped without touching the database.
    pub async fn append(
        &self,
        item_title: &str,
        comment: &str,
        edition: &str,
        rating: Rating,
    ) -> Result<AppendOutcome> {
        if is_blank(comment) {
            debug!("Skipping blank feedback for '{}' ({})", item_title, edition);
            return Ok(AppendOutcome::Skipped);
        }

        let submitted_at = now_seconds();
        let id = sqlx::query(
            r#"
            INSERT INTO feedback (item_title, comment, edition, rating, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(item_title)
        .bind(comment)
        .bind(edition)
        .bind(rating.as_str())
        .bind(format_timestamp(&submitted_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(
            "Saved feedback #{} for '{}' ({}, rating {})",
            id, item_title, edition, rating
        );
        Ok(AppendOutcome::Saved { id })
    }

    /// All feedback for one edition, most recent first
    pub async fn list_for_edition(&self, edition: &str) -> Result<Vec<FeedbackEntry>> {
        let rows: Vec<FeedbackRow> = sqlx::query_as(
            r#"
            SELECT id, item_title, edition, CAST(rating AS TEXT), comment, CAST(submitted_at AS TEXT)
            FROM feedback
            WHERE edition = ?
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .bind(edition)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    /// Import the flat-file feedback written by the earliest revision
    ///
    /// See [`super::legacy`] for the accepted layouts. The file is renamed to
    /// `<name>.imported` afterwards so the import happens once.
    pub async fn import_legacy_csv(&self, path: &Path, edition: &str) -> Result<usize> {
        if !path.is_file() {
            debug!("No legacy feedback file at {}", path.display());
            return Ok(0);
        }

        let source = import_source(path);
        let previous: Option<i64> =
            sqlx::query_scalar("SELECT rows_imported FROM legacy_imports WHERE source = ?")
                .bind(&source)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(rows) = previous {
            warn!(
                "{} was already imported ({} row(s)); not importing again",
                path.display(),
                rows
            );
            mark_imported(path);
            return Ok(0);
        }

        let records = super::legacy::read_legacy_csv(path)?;
        let total = records.len();

        let mut tx = self.pool.begin().await?;
        let mut imported = 0;
        for record in records {
            if is_blank(&record.comment) {
                continue;
            }
            let submitted_at = record.submitted_at.unwrap_or_else(now_seconds);
            sqlx::query(
                r#"
                INSERT INTO feedback (item_title, comment, edition, rating, submitted_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.item_title)
            .bind(&record.comment)
            .bind(edition)
            .bind(record.rating.as_str())
            .bind(format_timestamp(&submitted_at))
            .execute(&mut *tx)
            .await?;
            imported += 1;
        }

        // Recorded with the rows, so a file that cannot be renamed afterwards
        // is still imported only once
        sqlx::query("INSERT INTO legacy_imports (source, rows_imported) VALUES (?, ?)")
            .bind(&source)
            .bind(imported as i64)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            "Imported {} of {} legacy feedback row(s) from {} into edition '{}'",
            imported,
            total,
            path.display(),
            edition
        );
        mark_imported(path);
        Ok(imported)
    }
}

/// Key under which an imported file is recorded
fn import_source(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Rename an imported file to `<name>.imported`; failure only costs a warning
fn mark_imported(path: &Path) {
    let mut done = path.as_os_str().to_owned();
    done.push(".imported");
    if let Err(e) = std::fs::rename(path, &done) {
        warn!("Could not rename imported file {}: {}", path.display(), e);
    }
}

fn entry_from_row(row: FeedbackRow) -> FeedbackEntry {
    let (id, item_title, edition, rating, comment, submitted_at) = row;

    let submitted_at = submitted_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            warn!("Feedback #{} has unreadable timestamp {:?}", id, submitted_at);
            DateTime::<Utc>::UNIX_EPOCH
        });

    FeedbackEntry {
        id,
        item_title,
        edition,
        rating: Rating::from_legacy(Some(rating.as_str())),
        comment,
        submitted_at,
    }
}
