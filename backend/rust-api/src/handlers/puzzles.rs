use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{error_status, is_stale},
    middlewares::auth::JwtClaims,
    models::{AbandonResponse, SaveProgressRequest, SubmitRequest, SubmitResponse},
    services::{puzzle_service::PuzzleService, AppState},
};

/// GET /api/v1/puzzles/current - resume the assigned puzzle or generate a
/// fresh one.
pub async fn current_puzzle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Fetching current puzzle for {}", claims.sub);

    let service = PuzzleService::from_state(&state);
    match service.current_puzzle(&claims.sub).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            tracing::error!("Failed to fetch puzzle for {}: {:#}", claims.sub, e);
            Err(error_status(&e))
        }
    }
}

/// POST /api/v1/puzzles/current/progress - save in-progress answers.
pub async fn save_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Err(e) = req.validate() {
        return Err((StatusCode::BAD_REQUEST, format!("Validation error: {}", e)));
    }

    let service = PuzzleService::from_state(&state);
    match service.save_progress(&claims.sub, &req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            if is_stale(&e) {
                tracing::warn!(
                    "Progress save for {} against stale puzzle {}",
                    claims.sub,
                    req.puzzle_id
                );
            } else {
                tracing::error!("Failed to save progress for {}: {:#}", claims.sub, e);
            }
            Err(error_status(&e))
        }
    }
}

/// POST /api/v1/puzzles/current/submit - the scoring gate.
///
/// A stale puzzle reference is non-fatal: the client just raced a newer
/// assignment, so it gets the mustRestart shape with a conflict status.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, String)> {
    if let Err(e) = req.validate() {
        return Err((StatusCode::BAD_REQUEST, format!("Validation error: {}", e)));
    }

    tracing::info!(
        "Submission from {} for puzzle {} (correct={})",
        claims.sub,
        req.puzzle_id,
        req.correct
    );

    let service = PuzzleService::from_state(&state);
    match service.submit(&claims.sub, &req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) if is_stale(&e) => {
            Ok((StatusCode::CONFLICT, Json(SubmitResponse::stale(0))))
        }
        Err(e) => {
            tracing::error!("Failed to process submission for {}: {:#}", claims.sub, e);
            Err(error_status(&e))
        }
    }
}

/// POST /api/v1/puzzles/current/abandon - drop the current assignment.
pub async fn abandon(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = PuzzleService::from_state(&state);
    match service.abandon(&claims.sub).await {
        Ok(cleared) => Ok((StatusCode::OK, Json(AbandonResponse { cleared }))),
        Err(e) => {
            tracing::error!("Failed to abandon puzzle for {}: {:#}", claims.sub, e);
            Err(error_status(&e))
        }
    }
}
