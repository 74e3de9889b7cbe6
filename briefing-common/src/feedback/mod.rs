//! Feedback store: reader ratings and comments per item and edition

pub mod export;
pub mod legacy;
pub mod model;
pub mod store;

pub use export::{export_csv, EXPORT_HEADER};
pub use model::{is_blank, AppendOutcome, FeedbackEntry, Rating};
pub use store::FeedbackStore;
