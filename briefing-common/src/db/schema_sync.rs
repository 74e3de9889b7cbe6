//! Declarative schema synchronization
//!
//! Expected columns are declared in code (see `table_schemas.rs`). Syncing a
//! table compares them with `PRAGMA table_info` and adds whatever is missing
//! with `ALTER TABLE ADD COLUMN`, leaving existing rows in place.
//!
//! Type and constraint differences cannot be fixed by `ALTER TABLE` in SQLite;
//! they are reported and left for an explicit migration.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct FeedbackTableSchema;
//!
//! impl TableSchema for FeedbackTableSchema {
//!     fn table_name() -> &'static str { "feedback" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("rating", "TEXT").not_null().default("'unset'"),
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<FeedbackTableSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Defaults SQLite refuses in `ALTER TABLE ADD COLUMN`
const NON_CONSTANT_DEFAULTS: [&str; 3] = ["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME"];

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL", "TIMESTAMP")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// DEFAULT expression, as SQL text
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn has_non_constant_default(&self) -> bool {
        self.default_value
            .as_deref()
            .map(|d| NON_CONSTANT_DEFAULTS.iter().any(|nc| d.eq_ignore_ascii_case(nc)))
            .unwrap_or(false)
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between the declared and the actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database (fixable)
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (needs a migration)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint mismatch (needs a migration)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Expected schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Reads the actual schema from the database
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name`, ordered by position
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn column_exists(pool: &SqlitePool, table_name: &str, column: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
        )
        .bind(table_name)
        .bind(column)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }
}

/// Compares declared and actual columns
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");
        // Timestamps are stored as text; a legacy column declared either way is fine
        let timestamp = |t: &str| t.contains("TIMESTAMP") || t.contains("DATETIME") || text(t);

        (integer(&exp) && integer(&act))
            || (text(&exp) && text(&act))
            || (real(&exp) && real(&act))
            || (timestamp(&exp) && timestamp(&act))
    }
}

/// Applies fixable drift to the database
pub struct SchemaSync;

impl SchemaSync {
    /// Add missing columns to `T`'s table; report what cannot be fixed
    ///
    /// The table must already exist.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<usize> {
        let table_name = T::table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Schema sync: table '{}' does not exist, skipping", table_name);
            return Ok(0);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            info!("Schema up to date for '{}'", table_name);
            return Ok(0);
        }

        let mut added = 0;
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    if Self::add_column(pool, &table, &column).await? {
                        added += 1;
                    }
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!("Constraint mismatch in {}.{}: missing '{}'", table, column, constraint);
                }
            }
        }

        Ok(added)
    }

    /// Add one column; returns false when another connection added it first
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<bool> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column.name, column.sql_type
        );

        if column.primary_key || column.unique {
            warn!(
                "Cannot add PRIMARY KEY/UNIQUE column {}.{} via ALTER TABLE; adding it without the constraint",
                table, column.name
            );
        }

        // Non-constant defaults are rejected by ALTER TABLE: add the column bare
        // and fill existing rows afterwards.
        let backfill = column.has_non_constant_default();

        match (&column.default_value, backfill) {
            (Some(default), false) if column.not_null => {
                sql.push_str(&format!(" NOT NULL DEFAULT {}", default));
            }
            (Some(default), false) => {
                sql.push_str(&format!(" DEFAULT {}", default));
            }
            (None, _) if column.not_null => {
                warn!(
                    "Cannot add NOT NULL column {}.{} without DEFAULT; column will be nullable",
                    table, column.name
                );
            }
            _ => {}
        }

        info!("Adding column {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("Column {}.{} already added by another connection", table, column.name);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        if let (true, Some(default)) = (backfill, &column.default_value) {
            let fill = format!(
                "UPDATE {} SET {} = {} WHERE {} IS NULL",
                table, column.name, default, column.name
            );
            sqlx::query(&fill).execute(pool).await?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        // Single connection: every connection to :memory: is a separate database
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    struct NotesSchema;

    impl TableSchema for NotesSchema {
        fn table_name() -> &'static str {
            "notes"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "INTEGER").primary_key(),
                ColumnDefinition::new("body", "TEXT").not_null(),
                ColumnDefinition::new("label", "TEXT").not_null().default("'none'"),
                ColumnDefinition::new("created_at", "TIMESTAMP")
                    .not_null()
                    .default("CURRENT_TIMESTAMP"),
            ]
        }
    }

    #[test]
    fn test_column_definition_builder() {
        let col = ColumnDefinition::new("rating", "TEXT")
            .not_null()
            .unique()
            .default("'unset'");

        assert_eq!(col.name, "rating");
        assert!(col.not_null);
        assert!(col.unique);
        assert_eq!(col.default_value, Some("'unset'".to_string()));
        assert!(!col.has_non_constant_default());
        assert!(ColumnDefinition::new("t", "TIMESTAMP")
            .default("CURRENT_TIMESTAMP")
            .has_non_constant_default());
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("text", "TEXT"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR"));
        assert!(SchemaDiff::types_compatible("REAL", "FLOAT"));
        assert!(SchemaDiff::types_compatible("TIMESTAMP", "DATETIME"));
        assert!(SchemaDiff::types_compatible("TIMESTAMP", "TEXT"));

        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_introspect_table() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL, score REAL)")
            .execute(&pool)
            .await
            .unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "notes").await.unwrap();

        assert_eq!(columns.len(), 3);
        assert!(columns[0].pk);
        assert_eq!(columns[1].name, "body");
        assert!(columns[1].not_null);
        assert_eq!(columns[2].type_name, "REAL");
        assert!(SchemaIntrospector::column_exists(&pool, "notes", "score").await.unwrap());
        assert!(!SchemaIntrospector::column_exists(&pool, "notes", "label").await.unwrap());
    }

    #[tokio::test]
    async fn test_detect_missing_and_mismatched_columns() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, "notes").await.unwrap();
        let drift = SchemaDiff::compare("notes", &NotesSchema::expected_columns(), &actual);

        assert_eq!(drift.len(), 3);
        assert!(matches!(&drift[0], SchemaDrift::TypeMismatch { column, .. } if column == "body"));
        assert!(matches!(&drift[1], SchemaDrift::MissingColumn { column, .. } if column.name == "label"));
        assert!(matches!(&drift[2], SchemaDrift::MissingColumn { column, .. } if column.name == "created_at"));
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns_and_keeps_rows() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('kept')")
            .execute(&pool)
            .await
            .unwrap();

        let added = SchemaSync::sync_table::<NotesSchema>(&pool).await.unwrap();
        assert_eq!(added, 2);

        let (body, label, created_at): (String, String, Option<String>) =
            sqlx::query_as("SELECT body, label, CAST(created_at AS TEXT) FROM notes")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(body, "kept");
        assert_eq!(label, "none");
        assert!(created_at.is_some(), "existing rows are backfilled");

        // Second sync finds nothing to do
        assert_eq!(SchemaSync::sync_table::<NotesSchema>(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_missing_table_is_noop() {
        let pool = setup_test_db().await;
        assert_eq!(SchemaSync::sync_table::<NotesSchema>(&pool).await.unwrap(), 0);
        assert!(!SchemaIntrospector::table_exists(&pool, "notes").await.unwrap());
    }
}
