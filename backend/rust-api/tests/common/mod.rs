#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use crossword_api::middlewares::auth::{JwtClaims, JwtService};
use crossword_api::{config::Config, create_router, services::AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub async fn create_test_app() -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Deterministic generator fixture + per-process blob dir; set before
    // .env.test so these always win.
    std::env::set_var(
        "GENERATOR_SCRIPT",
        format!("{}/tests/fixtures/generator.sh", env!("CARGO_MANIFEST_DIR")),
    );
    std::env::set_var(
        "PUZZLE_DIR",
        std::env::temp_dir()
            .join(format!("crossword-api-test-{}", std::process::id()))
            .display()
            .to_string(),
    );
    std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    std::env::set_var("RATE_LIMIT_DISABLED", "1");

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    let config = Config::load().expect("Failed to load test configuration");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    let app_state = Arc::new(
        AppState::new(config, mongo_client, redis_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    create_router(app_state)
}

/// Mint a Bearer token the way the external identity provider would.
pub fn bearer_for(username: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: username.to_string(),
        exp: (now + 3600) as usize,
        iat: now as usize,
    };
    let token = JwtService::new(TEST_JWT_SECRET)
        .generate_token(claims)
        .expect("failed to mint test token");
    format!("Bearer {}", token)
}

pub async fn get_json(app: &Router, uri: &str, auth: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("authorization", auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    read_response(response).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    auth: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("authorization", auth)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_response(response).await
}

async fn read_response(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
