//! CSV export of feedback entries

use super::model::FeedbackEntry;
use crate::time::format_timestamp;
use crate::{Error, Result};

/// Header row of the export
pub const EXPORT_HEADER: [&str; 4] = ["Item", "Rating", "Comment", "Submitted At"];

/// Serialize entries as CSV with a header row
///
/// Fields are quoted as needed, so commas, quotes and newlines in comments
/// survive a round trip. Every record ends with `\n`.
pub fn export_csv(entries: &[FeedbackEntry]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.item_title.as_str(),
            entry.rating.as_str(),
            entry.comment.as_str(),
            format_timestamp(&entry.submitted_at).as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Rating;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn entry(id: i64, item: &str, rating: Rating, comment: &str) -> FeedbackEntry {
        FeedbackEntry {
            id,
            item_title: item.to_string(),
            edition: "Week 44".to_string(),
            rating,
            comment: comment.to_string(),
            submitted_at: Utc.with_ymd_and_hms(2025, 11, 2, 12, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let bytes = export_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Item,Rating,Comment,Submitted At\n");
    }

    #[test]
    fn test_export_layout() {
        let bytes = export_csv(&[entry(1, "Europe", Rating::Up, "great work")]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Item,Rating,Comment,Submitted At\nEurope,up,great work,2025-11-02 12:00:01\n"
        );
    }

    #[test]
    fn test_export_parses_back_to_same_tuples() {
        let entries = vec![
            entry(1, "Europe", Rating::Up, "plain"),
            entry(2, "Asia, Pacific", Rating::Down, "has, commas"),
            entry(3, "Middle East", Rating::Unset, "line one\nline \"two\""),
        ];

        let bytes = export_csv(&entries).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let parsed: HashSet<(String, String, String)> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string(), r[2].to_string())
            })
            .collect();

        let expected: HashSet<(String, String, String)> = entries
            .iter()
            .map(|e| (e.item_title.clone(), e.rating.to_string(), e.comment.clone()))
            .collect();
        assert_eq!(parsed, expected);
    }
}
