use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The immutable artifact written once per generation event, stored as a
/// JSON blob keyed by `puzzle_id`. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleRecord {
    pub puzzle_id: String,
    pub created_at: DateTime<Utc>,
    /// Raw solution block as printed by the generator.
    pub solution_raw: String,
    /// Raw display block as printed by the generator.
    pub puzzle_raw: String,
    /// Solution cells row-major; positions align 1:1 with `display_string`.
    pub answer_flattened: String,
    /// Player-facing starting state: the collapsed display with up to the
    /// reveal quota of cells patched in from the solution.
    pub display_string: String,
    /// Positions patched by the reveal transform. Audit only.
    pub indices_revealed: Vec<usize>,
    /// Clue text block.
    pub legend: String,
}

/// Payload for puzzle fetch: either a resumed assignment or a fresh grid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleResponse {
    pub puzzle_id: String,
    pub display_string: String,
    pub answer_flattened: String,
    pub legend: String,
    pub user_answers: Option<String>,
    pub wrong_attempts: u32,
    pub elapsed_time: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    #[validate(length(min = 1, message = "puzzleId must not be empty"))]
    pub puzzle_id: String,

    /// Flat per-cell answer string, same length domain as the display string.
    #[validate(length(max = 4096, message = "answers string too long"))]
    pub answers: String,

    #[validate(range(min = 0, message = "elapsedTime must be non-negative"))]
    pub elapsed_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressResponse {
    pub updated: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[validate(length(min = 1, message = "puzzleId must not be empty"))]
    pub puzzle_id: String,

    /// Whether the submitted grid matched `answerFlattened`. The client
    /// judges correctness against the fetched answer string; the gate only
    /// applies lifecycle and scoring rules to the verdict.
    pub correct: bool,

    #[validate(range(min = 0, message = "elapsedTime must be non-negative"))]
    pub elapsed_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// True when this call mutated durable state (attempt recorded or
    /// point awarded).
    pub updated: bool,
    pub solved: bool,
    pub already_solved: bool,
    pub remaining_attempts: u32,
    /// The current puzzle is gone (exhausted or stale); the client must
    /// fetch a fresh one.
    pub must_restart: bool,
    pub score: i64,
}

impl SubmitResponse {
    /// In-band shape for a submission against a puzzle that is no longer
    /// the user's current assignment.
    pub fn stale(score: i64) -> Self {
        Self {
            updated: false,
            solved: false,
            already_solved: false,
            remaining_attempts: 0,
            must_restart: true,
            score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonResponse {
    pub cleared: bool,
}
