//! Feedback submission, listing and CSV export

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use briefing_common::feedback::is_blank;
use briefing_common::{export_csv, AppendOutcome, FeedbackEntry, Rating};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::editions::EditionQuery;
use crate::AppState;

/// Body of POST /api/feedback
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub item_title: String,
    pub edition: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
}

/// POST /api/feedback
///
/// Blank comments answer `{"status": "skipped"}` and store nothing.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<AppendOutcome>, FeedbackError> {
    if known_title(&state, &request).await == Some(false) {
        warn!(
            "Feedback for '{}' does not match an item of edition {}",
            request.item_title, request.edition
        );
    }

    let outcome = state
        .feedback
        .append(
            &request.item_title,
            &request.comment,
            &request.edition,
            request.rating,
        )
        .await
        .map_err(|e| {
            error!("Failed to save feedback for '{}': {}", request.item_title, e);
            FeedbackError::Storage(e.to_string())
        })?;

    Ok(Json(outcome))
}

/// Whether the submitted title names an item of its edition
///
/// Titles are not enforced to exist. `None` when nothing was looked up: the
/// comment is blank, or the edition's content is unavailable.
async fn known_title(state: &AppState, request: &FeedbackRequest) -> Option<bool> {
    if is_blank(&request.comment) {
        return None;
    }

    let edition = request.edition.clone();
    let title = request.item_title.clone();
    let known = state
        .with_content(move |s| {
            let edition_ref = s.edition_ref(Some(&edition))?;
            let edition = s.load_edition(&edition_ref)?;
            Ok(edition.find_item(&title).is_some())
        })
        .await;

    match known {
        Ok(known) => Some(known),
        Err(e) => {
            warn!("Feedback for '{}' names unavailable content: {}", request.item_title, e);
            None
        }
    }
}

/// GET /api/feedback?edition=NAME
pub async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<EditionQuery>,
) -> Result<Json<Vec<FeedbackEntry>>, FeedbackError> {
    let Some(edition) = selected_edition(&state, &query).await else {
        return Ok(Json(Vec::new()));
    };

    let entries = state
        .feedback
        .list_for_edition(&edition)
        .await
        .map_err(|e| FeedbackError::Storage(e.to_string()))?;

    Ok(Json(entries))
}

/// GET /api/feedback/export?edition=NAME
///
/// CSV attachment with the columns Item, Rating, Comment, Submitted At.
pub async fn export_feedback(
    State(state): State<AppState>,
    Query(query): Query<EditionQuery>,
) -> Result<Response, FeedbackError> {
    let edition = selected_edition(&state, &query).await.unwrap_or_default();

    let entries = if edition.is_empty() {
        Vec::new()
    } else {
        state
            .feedback
            .list_for_edition(&edition)
            .await
            .map_err(|e| FeedbackError::Storage(e.to_string()))?
    };

    let csv = export_csv(&entries).map_err(|e| FeedbackError::Export(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&edition)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn selected_edition(state: &AppState, query: &EditionQuery) -> Option<String> {
    match query.name() {
        Some(name) => Some(name.to_string()),
        None => state
            .with_content(|s| s.edition_ref(None))
            .await
            .ok()
            .map(|e| e.name),
    }
}

/// Download name for an edition's export, safe for a header value
fn export_file_name(edition: &str) -> String {
    let stem: String = edition
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "feedback.csv".to_string()
    } else {
        format!("feedback-{}.csv", stem)
    }
}

/// Feedback API errors
#[derive(Debug)]
pub enum FeedbackError {
    /// The store could not be read or written; the reader may retry
    Storage(String),
    Export(String),
}

impl IntoResponse for FeedbackError {
    fn into_response(self) -> Response {
        let (status, notice) = match self {
            FeedbackError::Storage(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Feedback could not be saved or read right now: {}", msg),
            ),
            FeedbackError::Export(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Export failed: {}", msg),
            ),
        };

        let body = Json(json!({
            "status": "failed",
            "notice": notice,
        }));

        (status, body).into_response()
    }
}
