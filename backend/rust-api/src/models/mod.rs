pub mod puzzle;
pub mod user;

pub use puzzle::{
    AbandonResponse, PuzzleRecord, PuzzleResponse, SaveProgressRequest, SaveProgressResponse,
    SubmitRequest, SubmitResponse,
};
pub use user::{CurrentPuzzle, LeaderboardEntry, ScoreSummary, UserDoc, MAX_WRONG_ATTEMPTS};
