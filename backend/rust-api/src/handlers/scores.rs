use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;

use crate::{
    error::error_status,
    middlewares::auth::JwtClaims,
    models::ScoreSummary,
    services::{user_service::UserService, AppState},
};

const LEADERBOARD_SIZE: i64 = 10;

/// GET /api/v1/scores/me - the caller's score ledger.
pub async fn my_score(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = UserService::new(state.mongo.clone());

    match service.get_user(&claims.sub).await {
        Ok(Some(user)) => Ok((StatusCode::OK, Json(ScoreSummary::from(user)))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "User not found".to_string())),
        Err(e) => {
            tracing::error!("Failed to load score for {}: {:#}", claims.sub, e);
            Err(error_status(&e))
        }
    }
}

/// GET /api/v1/scores/leaderboard - top users by score.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = UserService::new(state.mongo.clone());

    match service.leaderboard(LEADERBOARD_SIZE).await {
        Ok(entries) => Ok((StatusCode::OK, Json(entries))),
        Err(e) => {
            tracing::error!("Failed to load leaderboard: {:#}", e);
            Err(error_status(&e))
        }
    }
}
