//! # Briefing Common Library
//!
//! Shared code for the briefing viewer:
//! - Content repository (edition discovery and JSON parsing)
//! - Feedback store (SQLite persistence and CSV export)
//! - Database initialization, schema sync and migrations
//! - Configuration loading
//! - Timestamp utilities

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod feedback;
pub mod time;

pub use content::{ContentError, ContentRepository, Edition, EditionRef, NewsItem};
pub use error::{Error, Result};
pub use feedback::{export_csv, AppendOutcome, FeedbackEntry, FeedbackStore, Rating};
