use axum::http::StatusCode;
use thiserror::Error;

/// Domain errors for the puzzle pipeline and lifecycle.
///
/// Services return `anyhow::Result`; these variants are attached where the
/// failure is part of the API contract so handlers can map them to proper
/// status codes via [`error_status`].
#[derive(Debug, Error)]
pub enum PuzzleError {
    /// The generator process produced output we cannot parse into a grid.
    #[error("malformed generator output: {0}")]
    MalformedGeneratorOutput(String),

    /// The generator process failed to spawn, crashed, or exited non-zero.
    #[error("crossword generator failed: {0}")]
    GeneratorFailure(String),

    /// The client referenced a puzzleId that is no longer the user's
    /// current assignment. Recoverable: no state was mutated.
    #[error("puzzle {0} is not the current assignment")]
    StalePuzzleReference(String),
}

impl PuzzleError {
    pub fn status(&self) -> StatusCode {
        match self {
            PuzzleError::MalformedGeneratorOutput(_) | PuzzleError::GeneratorFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
            PuzzleError::StalePuzzleReference(_) => StatusCode::CONFLICT,
        }
    }
}

/// Map a service error onto the HTTP (status, message) tuple handlers return.
/// Anything that is not a domain error is a generic server failure.
pub fn error_status(err: &anyhow::Error) -> (StatusCode, String) {
    match err.downcast_ref::<PuzzleError>() {
        Some(domain) => (domain.status(), domain.to_string()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub fn is_stale(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PuzzleError>(),
        Some(PuzzleError::StalePuzzleReference(_))
    )
}
