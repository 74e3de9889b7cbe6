//! Audio asset serving

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use briefing_common::content::audio_mime_type;
use briefing_common::ContentError;
use serde_json::json;
use tracing::{debug, warn};

use crate::AppState;

/// GET /editions/:edition/audio/:file
///
/// Only files inside the edition directory are served.
pub async fn serve_audio(
    State(state): State<AppState>,
    Path((edition, file)): Path<(String, String)>,
) -> Result<Response, AudioError> {
    let (name, file_name) = (edition.clone(), file.clone());
    let path = state
        .with_content(move |s| {
            let edition_ref = s.edition_ref(Some(&name))?;
            s.content
                .audio_path(&edition_ref, &file_name)
                .ok_or_else(|| ContentError::Missing {
                    path: edition_ref.directory().join(&file_name),
                })
        })
        .await
        .map_err(|e| {
            debug!("Audio request refused: {}", e);
            AudioError::NotFound(format!("{}/{}", edition, file))
        })?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!("Could not read audio {}: {}", path.display(), e);
        AudioError::NotFound(format!("{}/{}", edition, file))
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, audio_mime_type(&file))],
        bytes,
    )
        .into_response())
}

/// Audio serving errors
#[derive(Debug)]
pub enum AudioError {
    NotFound(String),
}

impl IntoResponse for AudioError {
    fn into_response(self) -> Response {
        let AudioError::NotFound(what) = self;
        let body = Json(json!({
            "error": format!("Audio not found: {}", what),
        }));

        (StatusCode::NOT_FOUND, body).into_response()
    }
}
