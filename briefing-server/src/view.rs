//! Per-request page model
//!
//! Everything the page shows for one request: the edition selector, the
//! selected edition with its audio, the feedback already given, and any
//! notices about content or storage problems.

use briefing_common::content::{AudioTrack, NewsItem};
use briefing_common::{ContentError, Edition, EditionRef, FeedbackEntry};
use serde::Serialize;

/// What a notice is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// No edition could be shown
    ContentMissing,
    /// An audio file referenced by the edition is not on disk
    AudioMissing,
    /// The feedback store could not be read or written
    StorageFault,
}

/// Message shown above the page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn content(err: &ContentError) -> Self {
        Self {
            kind: NoticeKind::ContentMissing,
            message: format!("Content unavailable: {}", err),
        }
    }

    pub fn audio(track: &AudioTrack) -> Self {
        Self {
            kind: NoticeKind::AudioMissing,
            message: format!("Audio file '{}' not found.", track.file),
        }
    }

    pub fn storage(err: &briefing_common::Error) -> Self {
        Self {
            kind: NoticeKind::StorageFault,
            message: format!("Feedback storage unavailable: {}", err),
        }
    }
}

/// One item as rendered, with the link and citation resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Explicit source, else the first URL embedded in the description
    pub link: Option<String>,
    pub citation: Option<String>,
}

impl From<&NewsItem> for ItemView {
    fn from(item: &NewsItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            tags: item.tags.clone(),
            link: item.link().map(str::to_string),
            citation: item.citation().map(str::to_string),
        }
    }
}

/// Edition header and items; audio is listed separately on the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionView {
    pub name: String,
    pub title: String,
    pub subtitle: String,
    pub period: String,
    pub top_developments: Vec<ItemView>,
    pub regional_overviews: Vec<ItemView>,
}

impl From<&Edition> for EditionView {
    fn from(edition: &Edition) -> Self {
        Self {
            name: edition.name.clone(),
            title: edition.title.clone(),
            subtitle: edition.subtitle.clone(),
            period: edition.period.clone(),
            top_developments: edition.top_developments.iter().map(ItemView::from).collect(),
            regional_overviews: edition.regional_overviews.iter().map(ItemView::from).collect(),
        }
    }
}

/// Page model for one request
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    /// Name of the edition shown, if one was resolved
    pub selected: Option<String>,
    pub editions: Vec<EditionRef>,
    pub edition: Option<EditionView>,
    pub audio: Vec<AudioTrack>,
    pub feedback: Vec<FeedbackEntry>,
    pub notices: Vec<Notice>,
}

impl PageView {
    pub fn new(editions: Vec<EditionRef>) -> Self {
        Self {
            selected: None,
            editions,
            edition: None,
            audio: Vec::new(),
            feedback: Vec::new(),
            notices: Vec::new(),
        }
    }
}
