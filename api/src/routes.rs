/// API route handlers for the Mediagate HTTP surface.
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use mediagate_shared::errors::GatewayError;
use mediagate_shared::models::{DownloadRequest, MediaKind, PlatformHint};

use crate::AppState;

// ====== REQUEST / RESPONSE TYPES ======

#[derive(Deserialize)]
pub struct MediaQuery {
    pub url: Option<String>,
    pub query: Option<String>,
}

impl MediaQuery {
    fn locator(self) -> Option<String> {
        self.url
            .or(self.query)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
pub struct LyricsQuery {
    pub song: Option<String>,
    pub q: Option<String>,
}

// ====== ERROR MAPPING ======

/// Map the gateway taxonomy onto HTTP statuses: 400 invalid input,
/// 404 not found, 500 everything else.
fn error_response(err: &GatewayError) -> Response {
    let status = match err {
        GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::DownloadFailed(_) | GatewayError::Stream(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(serde_json::json!({
            "error": { "kind": err.kind(), "message": err.to_string() }
        })),
    )
        .into_response()
}

fn missing_parameter(name: &str) -> Response {
    error_response(&GatewayError::InvalidInput(format!(
        "missing required parameter: {name}"
    )))
}

// ====== MEDIA ROUTES ======

async fn fetch_and_stream(
    state: &AppState,
    locator: String,
    kind: MediaKind,
    platform: PlatformHint,
) -> Response {
    let request = DownloadRequest::new(locator, kind, platform);

    match state.gateway.fetch_media(&request).await {
        Ok(payload) => {
            let disposition = format!("attachment; filename=\"{}\"", payload.filename);
            let size = payload.size_bytes;
            let mut response = (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, payload.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(payload.stream),
            )
                .into_response();
            if let Some(len) = size {
                response
                    .headers_mut()
                    .insert(header::CONTENT_LENGTH, header::HeaderValue::from(len));
            }
            response
        }
        Err(err) => {
            warn!(
                "Fetch failed: locator={:?} platform={} kind={} error={}",
                request.locator, request.platform, request.kind, err
            );
            error_response(&err)
        }
    }
}

/// GET /api/audio?query=<locator> - audio-only fetch; free text goes
/// through search resolution.
pub async fn fetch_audio(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MediaQuery>,
) -> Response {
    let Some(locator) = q.locator() else {
        return missing_parameter("query");
    };
    fetch_and_stream(&state, locator, MediaKind::Audio, PlatformHint::Generic).await
}

/// GET /api/video?url=<locator> - muxed audio+video from YouTube.
pub async fn fetch_video(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MediaQuery>,
) -> Response {
    let Some(locator) = q.locator() else {
        return missing_parameter("url");
    };
    fetch_and_stream(&state, locator, MediaKind::Video, PlatformHint::Youtube).await
}

/// GET /api/tiktok?url=<locator>
pub async fn fetch_tiktok(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MediaQuery>,
) -> Response {
    let Some(locator) = q.locator() else {
        return missing_parameter("url");
    };
    fetch_and_stream(&state, locator, MediaKind::Video, PlatformHint::Tiktok).await
}

/// GET /api/facebook?url=<locator>
pub async fn fetch_facebook(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MediaQuery>,
) -> Response {
    let Some(locator) = q.locator() else {
        return missing_parameter("url");
    };
    fetch_and_stream(&state, locator, MediaKind::Video, PlatformHint::Facebook).await
}

// ====== LYRICS ROUTE ======

/// GET /api/lyrics?song=<artist-title> - JSON proxy to the lyrics
/// collaborator. "artist - title" splits on the first dash; a bare
/// query is treated as a title only.
pub async fn lyrics(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LyricsQuery>,
) -> Response {
    let Some(song) = q
        .song
        .or(q.q)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return missing_parameter("song");
    };

    let (artist, title) = match song.split_once('-') {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (String::new(), song.clone()),
    };

    let mut url = match url::Url::parse(&state.lyrics_base) {
        Ok(u) => u,
        Err(e) => {
            return error_response(&GatewayError::DownloadFailed(format!(
                "bad lyrics endpoint: {e}"
            )))
        }
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(&artist).push(&title);
    }

    let response = match state.http.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Lyrics request failed for {:?}: {}", song, e);
            return error_response(&GatewayError::DownloadFailed(
                "lyrics lookup failed".to_string(),
            ));
        }
    };

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return error_response(&GatewayError::NotFound(format!("no lyrics for {song:?}")));
    }

    let body: serde_json::Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            warn!("Lyrics response unreadable for {:?}: {}", song, e);
            return error_response(&GatewayError::DownloadFailed(
                "lyrics lookup failed".to_string(),
            ));
        }
    };

    match body.get("lyrics").and_then(|v| v.as_str()) {
        Some(lyrics) => Json(serde_json::json!({
            "artist": if artist.is_empty() { "Unknown" } else { artist.as_str() },
            "title": title,
            "lyrics": lyrics.trim(),
        }))
        .into_response(),
        None => error_response(&GatewayError::NotFound(format!("no lyrics for {song:?}"))),
    }
}

// ====== HEALTH ======

/// GET /health
pub async fn health() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}
