mod common;

use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

async fn assigned_puzzle(app: &axum::Router, auth: &str) -> String {
    let (status, puzzle) = common::get_json(app, "/api/v1/puzzles/current", auth).await;
    assert_eq!(status, StatusCode::OK);
    puzzle["puzzleId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn correct_submission_awards_exactly_one_point() {
    let app = common::create_test_app().await;
    let user = format!("submit-user-{}", Uuid::new_v4());
    let auth = common::bearer_for(&user);
    let puzzle_id = assigned_puzzle(&app, &auth).await;

    let (status, first) = common::post_json(
        &app,
        "/api/v1/puzzles/current/submit",
        &auth,
        json!({ "puzzleId": puzzle_id, "correct": true, "elapsedTime": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["solved"], true);
    assert_eq!(first["alreadySolved"], false);
    assert_eq!(first["updated"], true);
    assert_eq!(first["score"], 1);

    // duplicate network resubmission: no second award
    let (status, second) = common::post_json(
        &app,
        "/api/v1/puzzles/current/submit",
        &auth,
        json!({ "puzzleId": puzzle_id, "correct": true, "elapsedTime": 30 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["solved"], true);
    assert_eq!(second["alreadySolved"], true);
    assert_eq!(second["updated"], false);
    assert_eq!(second["score"], 1);

    let (_, summary) = common::get_json(&app, "/api/v1/scores/me", &auth).await;
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["completedPuzzles"], json!([puzzle_id]));
    assert_eq!(summary["completedHistory"].as_array().unwrap().len(), 1);
    assert_eq!(summary["completedHistory"][0]["elapsedTime"], 30);
}

#[tokio::test]
#[serial]
async fn concurrent_correct_submissions_award_once() {
    let app = common::create_test_app().await;
    let user = format!("submit-user-{}", Uuid::new_v4());
    let auth = common::bearer_for(&user);
    let puzzle_id = assigned_puzzle(&app, &auth).await;

    let body = json!({ "puzzleId": puzzle_id, "correct": true, "elapsedTime": 15 });
    let (first, second) = tokio::join!(
        common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, body.clone()),
        common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, body.clone()),
    );

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.1["solved"], true);
    assert_eq!(second.1["solved"], true);

    let awards = [&first.1, &second.1]
        .iter()
        .filter(|r| r["updated"] == true)
        .count();
    assert_eq!(awards, 1, "exactly one of the duplicates may award");

    let (_, summary) = common::get_json(&app, "/api/v1/scores/me", &auth).await;
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["completedHistory"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn four_wrong_attempts_exhaust_the_puzzle() {
    let app = common::create_test_app().await;
    let user = format!("submit-user-{}", Uuid::new_v4());
    let auth = common::bearer_for(&user);
    let puzzle_id = assigned_puzzle(&app, &auth).await;

    let wrong = json!({ "puzzleId": puzzle_id, "correct": false, "elapsedTime": 5 });

    for attempt in 1..=3u32 {
        let (status, body) =
            common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, wrong.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);
        assert_eq!(body["solved"], false);
        assert_eq!(body["mustRestart"], false);
        assert_eq!(body["remainingAttempts"], 4 - attempt);
    }

    // fourth wrong attempt exhausts the puzzle
    let (status, fourth) =
        common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, wrong.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fourth["mustRestart"], true);
    assert_eq!(fourth["remainingAttempts"], 0);
    assert_eq!(fourth["solved"], false);

    // puzzle slot is cleared, so a fifth submission is stale
    let (status, fifth) =
        common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, wrong).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(fifth["mustRestart"], true);
    assert_eq!(fifth["updated"], false);

    let (_, summary) = common::get_json(&app, "/api/v1/scores/me", &auth).await;
    assert_eq!(summary["score"], 0);
    assert_eq!(summary["failedPuzzles"], json!([puzzle_id]));
    assert_eq!(summary["failedHistory"].as_array().unwrap().len(), 1);

    // and a fresh fetch assigns a new puzzle
    let next = assigned_puzzle(&app, &auth).await;
    assert_ne!(next, puzzle_id);
}

#[tokio::test]
async fn late_solve_of_an_exhausted_puzzle_is_stale() {
    let app = common::create_test_app().await;
    let user = format!("submit-user-{}", Uuid::new_v4());
    let auth = common::bearer_for(&user);
    let puzzle_id = assigned_puzzle(&app, &auth).await;

    let wrong = json!({ "puzzleId": puzzle_id, "correct": false, "elapsedTime": 5 });
    for _ in 0..4 {
        let _ = common::post_json(&app, "/api/v1/puzzles/current/submit", &auth, wrong.clone())
            .await;
    }

    // a correct submission after exhaustion awards nothing
    let (status, late) = common::post_json(
        &app,
        "/api/v1/puzzles/current/submit",
        &auth,
        json!({ "puzzleId": puzzle_id, "correct": true, "elapsedTime": 60 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(late["updated"], false);

    let (_, summary) = common::get_json(&app, "/api/v1/scores/me", &auth).await;
    assert_eq!(summary["score"], 0);
}

#[tokio::test]
async fn wrong_submission_against_foreign_puzzle_is_stale() {
    let app = common::create_test_app().await;
    let user = format!("submit-user-{}", Uuid::new_v4());
    let auth = common::bearer_for(&user);
    let _ = assigned_puzzle(&app, &auth).await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/puzzles/current/submit",
        &auth,
        json!({ "puzzleId": "someone-elses-puzzle", "correct": false, "elapsedTime": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["mustRestart"], true);

    // the real assignment is untouched
    let (_, puzzle) = common::get_json(&app, "/api/v1/puzzles/current", &auth).await;
    assert_eq!(puzzle["wrongAttempts"], 0);
}
