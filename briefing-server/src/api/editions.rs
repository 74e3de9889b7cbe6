//! Edition listing and the page model
//!
//! The page endpoint always answers 200: missing content and storage
//! faults are reported as notices inside the page instead of failing it.

use axum::{
    extract::{Query, State},
    Json,
};
use briefing_common::EditionRef;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::view::{EditionView, Notice, PageView};
use crate::AppState;

/// Query parameters selecting an edition
#[derive(Debug, Default, Deserialize)]
pub struct EditionQuery {
    /// Edition name; the most recent edition when absent or empty
    pub edition: Option<String>,
}

impl EditionQuery {
    pub fn name(&self) -> Option<&str> {
        self.edition.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// GET /api/editions
///
/// Returns editions newest first.
pub async fn list_editions(State(state): State<AppState>) -> Json<Vec<EditionRef>> {
    let editions = state
        .with_content(|s| Ok(s.editions()))
        .await
        .unwrap_or_else(|e| {
            error!("Could not list editions: {}", e);
            Vec::new()
        });
    Json(editions)
}

/// GET /api/page?edition=NAME
pub async fn get_page(
    State(state): State<AppState>,
    Query(query): Query<EditionQuery>,
) -> Json<PageView> {
    Json(build_page(&state, query.name()).await)
}

/// Assemble the page model for one request
pub async fn build_page(state: &AppState, requested: Option<&str>) -> PageView {
    let requested = requested.map(str::to_string);
    let mut view = match state
        .with_content(move |s| Ok(content_view(s, requested.as_deref())))
        .await
    {
        Ok(view) => view,
        Err(e) => {
            error!("Could not build page content: {}", e);
            let mut view = PageView::new(Vec::new());
            view.notices.push(Notice::content(&e));
            return view;
        }
    };

    let Some(selected) = view.selected.clone() else {
        return view;
    };

    match state.feedback.list_for_edition(&selected).await {
        Ok(entries) => view.feedback = entries,
        Err(e) => {
            warn!("Could not read feedback for {}: {}", selected, e);
            view.notices.push(Notice::storage(&e));
        }
    }

    debug!("Built page for {} ({} notices)", selected, view.notices.len());
    view
}

/// Content half of the page: selector, edition, audio and content notices
fn content_view(state: &AppState, requested: Option<&str>) -> PageView {
    let mut view = PageView::new(state.editions());

    let edition_ref = match state.edition_ref(requested) {
        Ok(edition_ref) => edition_ref,
        Err(e) => {
            warn!("No edition to show: {}", e);
            view.notices.push(Notice::content(&e));
            return view;
        }
    };
    view.selected = Some(edition_ref.name.clone());

    match state.load_edition(&edition_ref) {
        Ok(edition) => {
            view.audio = state.content.audio_tracks(&edition, &edition_ref);
            view.notices.extend(
                view.audio
                    .iter()
                    .filter(|track| !track.available)
                    .map(Notice::audio),
            );
            view.edition = Some(EditionView::from(&edition));
        }
        Err(e) => view.notices.push(Notice::content(&e)),
    }

    view
}
