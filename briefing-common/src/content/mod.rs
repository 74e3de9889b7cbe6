//! Content repository: edition documents on disk

pub mod legacy;
pub mod model;
pub mod repository;

pub use model::{audio_mime_type, AudioLink, AudioTrack, Edition, NewsItem, Section};
pub use repository::{read_edition, ContentError, ContentRepository, EditionRef};
