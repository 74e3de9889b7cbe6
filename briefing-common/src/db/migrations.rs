//! Versioned schema migrations
//!
//! The schema is built by an ordered list of migrations. Each applied version
//! is recorded in `schema_version`, so a step runs at most once per database,
//! and every step is written to be harmless if it does run again (concurrent
//! initialization from two processes).
//!
//! Databases created by earlier revisions of the store have a `feedback`
//! table but no `schema_version` rows. They start at version 0 and are
//! brought forward without losing rows.
//!
//! # Migration Guidelines
//!
//! 1. Never modify an existing migration; append a new one
//! 2. Prefer ALTER TABLE over DROP/CREATE so existing rows survive
//! 3. Bump `CURRENT_SCHEMA_VERSION` together with the new step

use crate::db::schema_sync::{SchemaIntrospector, SchemaSync};
use crate::db::table_schemas::{FeedbackTableSchema, FEEDBACK_TABLE};
use crate::feedback::Rating;
use crate::time::{format_timestamp, is_storage_format, parse_timestamp};
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 6;

/// Create the version bookkeeping table
pub async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest applied version, 0 when none
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !SchemaIntrospector::table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    // OR IGNORE: a concurrent initializer may have recorded it already
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations in order
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        info!("Migration v3 completed");
    }

    if current_version < 4 {
        migrate_v4(pool).await?;
        set_schema_version(pool, 4).await?;
        info!("Migration v4 completed");
    }

    if current_version < 5 {
        migrate_v5(pool).await?;
        set_schema_version(pool, 5).await?;
        info!("Migration v5 completed");
    }

    if current_version < 6 {
        migrate_v6(pool).await?;
        set_schema_version(pool, 6).await?;
        info!("Migration v6 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: feedback table with the original columns
///
/// A table left by an earlier revision is kept as is.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_title TEXT NOT NULL,
            comment TEXT NOT NULL,
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v2: add `edition` and `rating`
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let added = SchemaSync::sync_table::<FeedbackTableSchema>(pool).await?;
    info!("  Added {} column(s) to {}", added, FEEDBACK_TABLE);
    Ok(())
}

/// Migration v3: normalise historical rating values
///
/// Revisions disagreed on the rating representation (absent, optional,
/// emoji, numeric). Every stored value is mapped onto up/down/unset.
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    let raw_values: Vec<Option<String>> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT CAST(rating AS TEXT) FROM feedback
        WHERE rating IS NULL OR rating NOT IN ('up', 'down', 'unset')
        "#,
    )
    .fetch_all(pool)
    .await?;

    for raw in raw_values {
        let rating = Rating::from_legacy(raw.as_deref());
        let result = sqlx::query("UPDATE feedback SET rating = ? WHERE CAST(rating AS TEXT) IS ?")
            .bind(rating.as_str())
            .bind(raw.as_deref())
            .execute(pool)
            .await?;
        info!(
            "  Normalised {} row(s) with rating {:?} to '{}'",
            result.rows_affected(),
            raw,
            rating
        );
    }

    Ok(())
}

/// Migration v4: index for per-edition listing
async fn migrate_v4(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_feedback_edition_submitted ON feedback(edition, submitted_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Migration v5: rewrite historical timestamps into the storage format
///
/// Earlier revisions wrote fractional seconds, a `T` separator or an offset.
/// Text ordering only works on one layout, so every parsable value becomes
/// `YYYY-MM-DD HH:MM:SS` UTC. Unparsable values are left in place.
async fn migrate_v5(pool: &SqlitePool) -> Result<()> {
    let rows: Vec<(i64, Option<String>)> =
        sqlx::query_as("SELECT id, CAST(submitted_at AS TEXT) FROM feedback")
            .fetch_all(pool)
            .await?;

    let mut rewritten = 0;
    for (id, raw) in rows {
        let Some(raw) = raw else { continue };
        if is_storage_format(&raw) {
            continue;
        }

        match parse_timestamp(&raw) {
            Some(ts) => {
                sqlx::query("UPDATE feedback SET submitted_at = ? WHERE id = ?")
                    .bind(format_timestamp(&ts))
                    .bind(id)
                    .execute(pool)
                    .await?;
                rewritten += 1;
            }
            None => warn!("  Feedback #{} keeps unrecognised timestamp {:?}", id, raw),
        }
    }

    info!("  Rewrote {} timestamp(s) into storage format", rewritten);
    Ok(())
}

/// Migration v6: bookkeeping for one-time legacy feedback imports
async fn migrate_v6(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS legacy_imports (
            source TEXT PRIMARY KEY,
            rows_imported INTEGER NOT NULL,
            imported_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
