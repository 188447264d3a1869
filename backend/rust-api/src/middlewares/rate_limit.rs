use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::AppState;

// Fixed-window limits for the puzzle endpoints. Generation spawns an
// external process, so the per-user allowance is deliberately small.
const RATE_LIMIT_PER_USER: u32 = 60; // requests per minute
const RATE_LIMIT_PER_IP: u32 = 120; // requests per minute
const RATE_WINDOW_SECONDS: u64 = 60;

fn extract_client_ip(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    if let Some(v) = headers.get("x-forwarded-for") {
        if let Ok(s) = v.to_str() {
            // comma separated list; take first
            return s.split(',').next().unwrap_or(s).trim().to_string();
        }
    }

    if let Some(v) = headers.get("x-real-ip") {
        if let Ok(s) = v.to_str() {
            return s.trim().to_string();
        }
    }

    if let Some(ci) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return ci.0.ip().to_string();
    }

    "unknown".to_string()
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Allow disabling in local perf runs
    if std::env::var("RATE_LIMIT_DISABLED").unwrap_or_default() == "1" {
        return Ok(next.run(request).await);
    }

    let client_ip = extract_client_ip(request.headers(), request.extensions());
    let username = request
        .extensions()
        .get::<super::auth::JwtClaims>()
        .map(|claims| claims.sub.clone());

    if let Some(user) = &username {
        let allowed = check_rate_limit(
            &state.redis,
            &format!("ratelimit:user:{}", user),
            RATE_LIMIT_PER_USER,
        )
        .await
        .map_err(|e| {
            tracing::error!("Rate limit check failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        if !allowed {
            tracing::warn!("Rate limit exceeded for user: {}", user);
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    let allowed = check_rate_limit(
        &state.redis,
        &format!("ratelimit:ip:{}", client_ip),
        RATE_LIMIT_PER_IP,
    )
    .await
    .map_err(|e| {
        tracing::error!("Rate limit check failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !allowed {
        tracing::warn!("Rate limit exceeded for ip: {}", client_ip);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}

async fn check_rate_limit(
    redis: &ConnectionManager,
    key: &str,
    limit: u32,
) -> Result<bool, redis::RedisError> {
    let mut conn = redis.clone();

    let count: u32 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
    if count == 1 {
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(RATE_WINDOW_SECONDS)
            .query_async::<()>(&mut conn)
            .await?;
    }

    Ok(count <= limit)
}
