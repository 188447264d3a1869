use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use mongodb::Database;
use rand::Rng;
use redis::aio::ConnectionManager;

use crate::error::PuzzleError;
use crate::metrics::{
    record_solved_flag_hit, record_solved_flag_miss, PUZZLES_GENERATED_TOTAL, SUBMISSIONS_TOTAL,
};
use crate::models::user::MAX_WRONG_ATTEMPTS;
use crate::models::{
    CurrentPuzzle, PuzzleRecord, PuzzleResponse, SaveProgressRequest, SaveProgressResponse,
    SubmitRequest, SubmitResponse,
};
use crate::puzzle::{reveal_letters, ParsedGrid};
use crate::services::generator::GridGenerator;
use crate::services::puzzle_store::PuzzleStore;
use crate::services::user_service::UserService;
use crate::services::AppState;
use crate::utils::retry::{retry_async, RetryConfig};

const SOLVED_FLAG_TTL_SECONDS: u64 = 86_400;

/// Orchestrates the puzzle lifecycle: generation, assignment, resume,
/// progress saves, and the scoring gate for submissions.
pub struct PuzzleService {
    mongo: Database,
    redis: ConnectionManager,
    generator: Arc<dyn GridGenerator>,
    store: PuzzleStore,
    grid_rows: usize,
    reveal_quota: usize,
}

impl PuzzleService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            mongo: state.mongo.clone(),
            redis: state.redis.clone(),
            generator: state.generator.clone(),
            store: PuzzleStore::new(&state.config.puzzle_dir),
            grid_rows: state.config.grid_rows,
            reveal_quota: state.config.reveal_quota,
        }
    }

    /// Return the user's current puzzle, generating and assigning a fresh
    /// one only when no assignment exists (resume semantics).
    pub async fn current_puzzle(&self, username: &str) -> Result<PuzzleResponse> {
        let users = UserService::new(self.mongo.clone());
        users.ensure_user(username).await?;
        let user = users
            .get_user(username)
            .await?
            .ok_or_else(|| anyhow!("user {} missing after upsert", username))?;

        if let CurrentPuzzle::Assigned {
            puzzle_id,
            answers,
            wrong_attempts,
            elapsed_time,
        } = user.current_puzzle()
        {
            match self.store.load(&puzzle_id).await {
                Ok(Some(record)) => {
                    tracing::debug!("Resuming puzzle {} for {}", puzzle_id, username);
                    return Ok(PuzzleResponse {
                        puzzle_id: record.puzzle_id,
                        display_string: record.display_string,
                        answer_flattened: record.answer_flattened,
                        legend: record.legend,
                        user_answers: answers,
                        wrong_attempts,
                        elapsed_time,
                    });
                }
                Ok(None) => {
                    tracing::warn!(
                        "Current puzzle {} for {} has no stored record, reassigning",
                        puzzle_id,
                        username
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load puzzle {} for {}: {:#}, reassigning",
                        puzzle_id,
                        username,
                        e
                    );
                }
            }
            // The pointer references a record we cannot serve; drop it and
            // fall through to a fresh generation.
            users
                .clear_current_puzzle(username, Some(puzzle_id.as_str()))
                .await?;
        }

        let raw = match self.generator.generate().await {
            Ok(raw) => raw,
            Err(e) => {
                PUZZLES_GENERATED_TOTAL
                    .with_label_values(&["generator_error"])
                    .inc();
                return Err(e);
            }
        };

        let grid = match ParsedGrid::parse(&raw, self.grid_rows) {
            Ok(grid) => grid,
            Err(e) => {
                PUZZLES_GENERATED_TOTAL
                    .with_label_values(&["parse_error"])
                    .inc();
                return Err(e.into());
            }
        };

        let record = self.build_record(&grid);

        // Best-effort archive: the user still gets the in-memory puzzle
        // when the blob write fails; a later resume will regenerate.
        if let Err(e) = self.store.save(&record).await {
            tracing::error!("Failed to persist puzzle {}: {:#}", record.puzzle_id, e);
        }

        users.set_current_puzzle(username, &record.puzzle_id).await?;
        PUZZLES_GENERATED_TOTAL
            .with_label_values(&["generated"])
            .inc();
        tracing::info!(
            "Assigned puzzle {} ({}x{}, {} revealed) to {}",
            record.puzzle_id,
            grid.rows(),
            grid.cols(),
            record.indices_revealed.len(),
            username
        );

        Ok(PuzzleResponse {
            puzzle_id: record.puzzle_id,
            display_string: record.display_string,
            answer_flattened: record.answer_flattened,
            legend: record.legend,
            user_answers: None,
            wrong_attempts: 0,
            elapsed_time: 0,
        })
    }

    pub async fn save_progress(
        &self,
        username: &str,
        req: &SaveProgressRequest,
    ) -> Result<SaveProgressResponse> {
        let users = UserService::new(self.mongo.clone());
        users
            .save_progress(username, &req.puzzle_id, &req.answers, req.elapsed_time)
            .await?;
        Ok(SaveProgressResponse { updated: true })
    }

    /// The scoring gate (one submission verdict in, lifecycle transition
    /// out). The only mutation that may race with a duplicate of itself is
    /// the award, which is a single conditional update in the store.
    pub async fn submit(&self, username: &str, req: &SubmitRequest) -> Result<SubmitResponse> {
        let puzzle_id = req.puzzle_id.as_str();

        // Duplicate-resubmission defense: a solved flag set by an earlier
        // success answers without touching the document store.
        if let Some(score) = self.check_solved_flag(username, puzzle_id).await? {
            record_solved_flag_hit();
            SUBMISSIONS_TOTAL
                .with_label_values(&["already_solved"])
                .inc();
            return Ok(SubmitResponse {
                updated: false,
                solved: true,
                already_solved: true,
                remaining_attempts: 0,
                must_restart: false,
                score,
            });
        }
        record_solved_flag_miss();

        let users = UserService::new(self.mongo.clone());

        if !req.correct {
            return self.handle_wrong(&users, username, puzzle_id).await;
        }

        let user = users
            .get_user(username)
            .await?
            .ok_or_else(|| anyhow!("user {} not found", username))?;
        let remaining = user.remaining_attempts();

        if user.completed_puzzles.iter().any(|p| p == puzzle_id) {
            // Document store already knows; heal the cache flag.
            self.set_solved_flag(username, puzzle_id, user.score).await;
            SUBMISSIONS_TOTAL
                .with_label_values(&["already_solved"])
                .inc();
            return Ok(SubmitResponse {
                updated: false,
                solved: true,
                already_solved: true,
                remaining_attempts: remaining,
                must_restart: false,
                score: user.score,
            });
        }

        let is_current = matches!(
            user.current_puzzle(),
            CurrentPuzzle::Assigned { puzzle_id: current, .. } if current == puzzle_id
        );
        if !is_current {
            SUBMISSIONS_TOTAL.with_label_values(&["stale"]).inc();
            return Err(PuzzleError::StalePuzzleReference(puzzle_id.to_string()).into());
        }

        let award = users
            .award_point_if_first(username, puzzle_id, req.elapsed_time)
            .await?;
        self.set_solved_flag(username, puzzle_id, award.score).await;
        users.clear_current_puzzle(username, Some(puzzle_id)).await?;

        if award.updated {
            SUBMISSIONS_TOTAL.with_label_values(&["solved"]).inc();
            tracing::info!(
                "{} solved puzzle {} (score now {})",
                username,
                puzzle_id,
                award.score
            );
        } else {
            // Lost a race with a concurrent duplicate of this submission.
            SUBMISSIONS_TOTAL
                .with_label_values(&["already_solved"])
                .inc();
        }

        Ok(SubmitResponse {
            updated: award.updated,
            solved: true,
            already_solved: !award.updated,
            remaining_attempts: remaining,
            must_restart: false,
            score: award.score,
        })
    }

    async fn handle_wrong(
        &self,
        users: &UserService,
        username: &str,
        puzzle_id: &str,
    ) -> Result<SubmitResponse> {
        let attempts = match users.increment_wrong_attempt(username, puzzle_id).await? {
            Some(attempts) => attempts,
            None => {
                SUBMISSIONS_TOTAL.with_label_values(&["stale"]).inc();
                return Err(PuzzleError::StalePuzzleReference(puzzle_id.to_string()).into());
            }
        };

        let score = users
            .get_user(username)
            .await?
            .map(|u| u.score)
            .unwrap_or(0);

        if attempts >= MAX_WRONG_ATTEMPTS {
            users.add_failed_puzzle(username, puzzle_id).await?;
            users.clear_current_puzzle(username, Some(puzzle_id)).await?;
            SUBMISSIONS_TOTAL.with_label_values(&["exhausted"]).inc();
            tracing::info!(
                "{} exhausted puzzle {} after {} wrong attempts",
                username,
                puzzle_id,
                attempts
            );
            return Ok(SubmitResponse {
                updated: true,
                solved: false,
                already_solved: false,
                remaining_attempts: 0,
                must_restart: true,
                score,
            });
        }

        SUBMISSIONS_TOTAL.with_label_values(&["wrong"]).inc();
        Ok(SubmitResponse {
            updated: true,
            solved: false,
            already_solved: false,
            remaining_attempts: MAX_WRONG_ATTEMPTS - attempts,
            must_restart: false,
            score,
        })
    }

    /// Drop the current assignment without failure bookkeeping.
    pub async fn abandon(&self, username: &str) -> Result<bool> {
        let users = UserService::new(self.mongo.clone());
        users.clear_current_puzzle(username, None).await
    }

    fn build_record(&self, grid: &ParsedGrid) -> PuzzleRecord {
        let mut rng = rand::rng();
        let answer = grid.answer_flattened();
        let (display_string, indices_revealed) =
            reveal_letters(&grid.display_string(), &answer, self.reveal_quota, &mut rng);

        PuzzleRecord {
            puzzle_id: new_puzzle_id(&mut rng),
            created_at: Utc::now(),
            solution_raw: grid.solution_text().to_string(),
            puzzle_raw: grid.display_text().to_string(),
            answer_flattened: answer,
            display_string,
            indices_revealed,
            legend: grid.legend().to_string(),
        }
    }

    async fn check_solved_flag(&self, username: &str, puzzle_id: &str) -> Result<Option<i64>> {
        let key = solved_key(username, puzzle_id);
        let cached: Option<String> = retry_async(RetryConfig::default(), || self.redis_get(&key))
            .await
            .context("failed to check solved flag")?;
        Ok(cached.and_then(|v| v.parse().ok()))
    }

    /// Best-effort: the flag is a cache in front of the durable ledger, so
    /// a failure here only costs the short-circuit.
    async fn set_solved_flag(&self, username: &str, puzzle_id: &str, score: i64) {
        let key = solved_key(username, puzzle_id);
        if let Err(e) = retry_async(RetryConfig::default(), || self.redis_setex(&key, score)).await
        {
            tracing::warn!("Failed to set solved flag {}: {}", key, e);
        }
    }

    async fn redis_get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.redis.clone();
        redis::cmd("GET").arg(key).query_async(&mut conn).await
    }

    async fn redis_setex(&self, key: &str, score: i64) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(SOLVED_FLAG_TTL_SECONDS)
            .arg(score.to_string())
            .query_async::<()>(&mut conn)
            .await
    }
}

fn solved_key(username: &str, puzzle_id: &str) -> String {
    format!("puzzle:solved:{}:{}", username, puzzle_id)
}

/// Time- plus random-derived identifier, e.g. `2026-08-07T12-30-05-482913`.
fn new_puzzle_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{:06}",
        Utc::now().format("%Y-%m-%dT%H-%M-%S"),
        rng.random_range(100_000..1_000_000)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puzzle_ids_carry_timestamp_and_suffix() {
        let mut rng = rand::rng();
        let id = new_puzzle_id(&mut rng);
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        assert!(id.contains('T'));
    }
}
