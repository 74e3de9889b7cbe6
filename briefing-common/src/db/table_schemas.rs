//! Table schema definitions
//!
//! Single source of truth for the columns the feedback store expects.

use crate::config::DEFAULT_LEGACY_EDITION;
use crate::db::schema_sync::{ColumnDefinition, TableSchema};

/// Name of the feedback table
pub const FEEDBACK_TABLE: &str = "feedback";

/// Feedback table schema
///
/// `edition` and `rating` did not exist in the first revisions of the store;
/// rows created before them receive the column defaults.
pub struct FeedbackTableSchema;

impl TableSchema for FeedbackTableSchema {
    fn table_name() -> &'static str {
        FEEDBACK_TABLE
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("item_title", "TEXT").not_null(),
            ColumnDefinition::new("comment", "TEXT").not_null(),
            ColumnDefinition::new("submitted_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
            ColumnDefinition::new("edition", "TEXT")
                .not_null()
                .default(format!("'{}'", DEFAULT_LEGACY_EDITION)),
            ColumnDefinition::new("rating", "TEXT")
                .not_null()
                .default("'unset'"),
        ]
    }
}
