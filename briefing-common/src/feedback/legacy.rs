//! Reader for flat-file feedback
//!
//! Two layouts are understood:
//! - `item,feedback`: the earliest revision. The item title was written
//!   unquoted, so a title containing commas spills over several fields; the
//!   comment is always the last field.
//! - The export layout (`Item,Rating,Comment,Submitted At`), matched by header
//!   name so column order does not matter.

use super::model::Rating;
use crate::time::parse_timestamp;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::warn;

/// One row recovered from a legacy CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRecord {
    pub item_title: String,
    pub comment: String,
    pub rating: Rating,
    pub submitted_at: Option<DateTime<Utc>>,
}

struct Columns {
    item: usize,
    comment: usize,
    rating: Option<usize>,
    submitted_at: Option<usize>,
}

/// Parse a legacy feedback file
pub fn read_legacy_csv(path: &Path) -> Result<Vec<LegacyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let columns = resolve_columns(&headers)
        .ok_or_else(|| Error::InvalidInput(format!("unrecognised feedback header in {}", path.display())))?;
    let two_column = headers.len() == 2 && columns.rating.is_none();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed legacy feedback row {}: {}", line + 2, e);
                continue;
            }
        };

        let record = if two_column && row.len() > 2 {
            let mut fields: Vec<&str> = row.iter().collect();
            let comment = fields.pop().unwrap_or_default().to_string();
            LegacyRecord {
                item_title: fields.join(","),
                comment,
                rating: Rating::Unset,
                submitted_at: None,
            }
        } else {
            LegacyRecord {
                item_title: row.get(columns.item).unwrap_or_default().to_string(),
                comment: row.get(columns.comment).unwrap_or_default().to_string(),
                rating: Rating::from_legacy(columns.rating.and_then(|i| row.get(i))),
                submitted_at: columns
                    .submitted_at
                    .and_then(|i| row.get(i))
                    .and_then(parse_timestamp),
            }
        };

        records.push(record);
    }

    Ok(records)
}

fn resolve_columns(headers: &[String]) -> Option<Columns> {
    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    Some(Columns {
        item: find(&["item", "item_title", "title"])?,
        comment: find(&["feedback", "comment"])?,
        rating: find(&["rating"]),
        submitted_at: find(&["submitted at", "submitted_at", "timestamp"]),
    })
}
