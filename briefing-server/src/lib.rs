//! briefing-server library - HTTP front end of the briefing viewer
//!
//! Serves the edition page model, audio assets and the feedback API over
//! the shared content repository and feedback store.

use axum::Router;
use briefing_common::content::legacy::{self, DEFAULT_EDITION_NAME};
use briefing_common::{ContentError, ContentRepository, Edition, EditionRef, FeedbackStore};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod view;

/// Application state shared across HTTP handlers
///
/// Holds no per-reader state: every page is built from scratch per request.
#[derive(Clone)]
pub struct AppState {
    pub content: ContentRepository,
    pub feedback: FeedbackStore,
    /// Override document for the built-in briefing, used when the content
    /// root holds no editions
    pub legacy_override: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(content: ContentRepository, feedback: FeedbackStore) -> Self {
        Self {
            content,
            feedback,
            legacy_override: None,
        }
    }

    pub fn with_legacy_override(mut self, path: Option<PathBuf>) -> Self {
        self.legacy_override = path;
        self
    }

    /// Editions offered to the reader, most recent first
    ///
    /// Falls back to the single built-in edition when the content root is
    /// empty and an override document is configured.
    pub fn editions(&self) -> Vec<EditionRef> {
        let editions = self.content.list_editions();
        match (&self.legacy_override, editions.is_empty()) {
            (Some(path), true) => vec![legacy_edition_ref(path)],
            _ => editions,
        }
    }

    /// Resolve an edition by name, or the most recent one when `None`
    pub fn edition_ref(&self, name: Option<&str>) -> Result<EditionRef, ContentError> {
        let editions = self.editions();
        match name {
            Some(name) => editions
                .into_iter()
                .find(|e| e.name == name)
                .ok_or_else(|| ContentError::UnknownEdition {
                    name: name.to_string(),
                }),
            None => editions
                .into_iter()
                .next()
                .ok_or_else(|| ContentError::NoEditions {
                    root: self.content.root().to_path_buf(),
                }),
        }
    }

    /// Parse the document behind a resolved edition
    pub fn load_edition(&self, edition_ref: &EditionRef) -> Result<Edition, ContentError> {
        if self.is_legacy(edition_ref) {
            legacy::load_with_override(&edition_ref.path)
        } else {
            self.content.load(Some(edition_ref))
        }
    }

    /// Run filesystem-bound content work on the blocking pool
    ///
    /// Edition discovery walks the content root and parses documents, so
    /// handlers go through here instead of touching the disk on the runtime.
    pub async fn with_content<T, F>(&self, work: F) -> Result<T, ContentError>
    where
        F: FnOnce(&AppState) -> Result<T, ContentError> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || work(&state))
            .await
            .map_err(|e| ContentError::Internal(format!("content task failed: {}", e)))?
    }

    fn is_legacy(&self, edition_ref: &EditionRef) -> bool {
        edition_ref.name == DEFAULT_EDITION_NAME
            && self.legacy_override.as_deref() == Some(edition_ref.path.as_path())
    }
}

/// Edition reference for the built-in briefing
///
/// Audio is resolved next to the override document.
fn legacy_edition_ref(override_path: &Path) -> EditionRef {
    let modified = std::fs::metadata(override_path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    EditionRef {
        name: DEFAULT_EDITION_NAME.to_string(),
        path: override_path.to_path_buf(),
        modified,
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let api = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/editions", get(api::list_editions))
        .route("/api/page", get(api::get_page))
        .route(
            "/api/feedback",
            get(api::list_feedback).post(api::submit_feedback),
        )
        .route("/api/feedback/export", get(api::export_feedback))
        .route("/editions/:edition/audio/:file", get(api::serve_audio));

    let ui = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(api)
        .merge(ui)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
