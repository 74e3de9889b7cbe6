//! Feedback records

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reader's verdict on an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
    #[default]
    Unset,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Up => "up",
            Rating::Down => "down",
            Rating::Unset => "unset",
        }
    }

    /// Map a value written by any earlier revision onto the tri-state
    ///
    /// Unknown values become `Unset` rather than failing.
    pub fn from_legacy(raw: Option<&str>) -> Rating {
        let Some(raw) = raw else {
            return Rating::Unset;
        };

        match raw.trim().to_lowercase().as_str() {
            "up" | "👍" | "thumbs_up" | "thumbs up" | "positive" | "1" | "+1" | "true" | "yes" => {
                Rating::Up
            }
            "down" | "👎" | "thumbs_down" | "thumbs down" | "negative" | "-1" | "0" | "false"
            | "no" => Rating::Down,
            _ => Rating::Unset,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "up" => Ok(Rating::Up),
            "down" => Ok(Rating::Down),
            "unset" | "" => Ok(Rating::Unset),
            other => Err(Error::InvalidInput(format!("unknown rating: {}", other))),
        }
    }
}

/// One stored piece of reader feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackEntry {
    pub id: i64,
    /// Title of the item the feedback is about (not enforced to exist)
    pub item_title: String,
    pub edition: String,
    pub rating: Rating,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

/// Result of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AppendOutcome {
    Saved { id: i64 },
    /// Blank comment; nothing was written
    Skipped,
}

/// True when a comment carries no text worth keeping
pub fn is_blank(comment: &str) -> bool {
    comment.trim().is_empty()
}
