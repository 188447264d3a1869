use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::error::PuzzleError;
use crate::models::user::UserDoc;
use crate::models::LeaderboardEntry;
use crate::utils::time::now_bson;

const USERS_COLLECTION: &str = "users";

pub struct AwardOutcome {
    pub updated: bool,
    pub score: i64,
}

/// All access to the per-user document: the score ledger and the
/// single-slot current-puzzle state.
///
/// Every mutation that races with itself (wrong-attempt counting, point
/// awarding, slot clearing) is a single conditional update executed by the
/// server; nothing here reads a counter and writes it back.
pub struct UserService {
    mongo: Database,
}

impl UserService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> Collection<UserDoc> {
        self.mongo.collection(USERS_COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.mongo.collection(USERS_COLLECTION)
    }

    /// Upsert the baseline document for a username on first contact.
    pub async fn ensure_user(&self, username: &str) -> Result<()> {
        self.docs()
            .update_one(
                doc! { "username": username },
                doc! { "$setOnInsert": {
                    "username": username,
                    "createdAt": now_bson(),
                    "score": 0i64,
                    "completedPuzzles": [],
                    "completedHistory": [],
                    "failedPuzzles": [],
                    "failedHistory": [],
                    "currentPuzzleId": Bson::Null,
                    "currentPuzzleAnswers": Bson::Null,
                    "currentPuzzleWrongAttempts": 0i32,
                    "currentPuzzleElapsedTime": 0i64,
                } },
            )
            .upsert(true)
            .await
            .context("failed to upsert user")?;
        Ok(())
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<UserDoc>> {
        self.users()
            .find_one(doc! { "username": username })
            .await
            .context("failed to load user")
    }

    /// Assign a freshly generated puzzle: resets attempts, answers and the
    /// elapsed-time clock.
    pub async fn set_current_puzzle(&self, username: &str, puzzle_id: &str) -> Result<()> {
        let res = self
            .docs()
            .update_one(
                doc! { "username": username },
                doc! { "$set": {
                    "currentPuzzleId": puzzle_id,
                    "currentPuzzleAnswers": Bson::Null,
                    "currentPuzzleWrongAttempts": 0i32,
                    "currentPuzzleElapsedTime": 0i64,
                    "currentPuzzleUpdatedAt": now_bson(),
                } },
            )
            .await
            .context("failed to assign puzzle")?;

        anyhow::ensure!(res.matched_count == 1, "user {} not found", username);
        Ok(())
    }

    /// Persist in-progress answers. The filter pins the currently assigned
    /// puzzleId, so a save against anything else matches nothing and
    /// mutates nothing.
    pub async fn save_progress(
        &self,
        username: &str,
        puzzle_id: &str,
        answers: &str,
        elapsed_time: i64,
    ) -> Result<()> {
        let res = self
            .docs()
            .update_one(
                doc! { "username": username, "currentPuzzleId": puzzle_id },
                doc! { "$set": {
                    "currentPuzzleAnswers": answers,
                    "currentPuzzleElapsedTime": elapsed_time,
                    "currentPuzzleUpdatedAt": now_bson(),
                } },
            )
            .await
            .context("failed to save progress")?;

        if res.matched_count == 0 {
            return Err(PuzzleError::StalePuzzleReference(puzzle_id.to_string()).into());
        }
        Ok(())
    }

    /// Atomic guarded increment of the wrong-attempt counter. Returns the
    /// new count, or `None` when the puzzle is no longer current (a race
    /// with a newer assignment): the write is skipped in that case.
    pub async fn increment_wrong_attempt(
        &self,
        username: &str,
        puzzle_id: &str,
    ) -> Result<Option<u32>> {
        let res = self
            .docs()
            .find_one_and_update(
                doc! { "username": username, "currentPuzzleId": puzzle_id },
                doc! {
                    "$inc": { "currentPuzzleWrongAttempts": 1i32 },
                    "$set": { "currentPuzzleUpdatedAt": now_bson() },
                },
            )
            .return_document(ReturnDocument::After)
            .projection(doc! { "currentPuzzleWrongAttempts": 1 })
            .await
            .context("failed to record wrong attempt")?;

        Ok(res.map(|d| read_u32(&d, "currentPuzzleWrongAttempts")))
    }

    /// Clear the current-puzzle slot back to the unassigned state. When
    /// `puzzle_id` is given, the clear only applies while that puzzle is
    /// still the current one.
    pub async fn clear_current_puzzle(
        &self,
        username: &str,
        puzzle_id: Option<&str>,
    ) -> Result<bool> {
        let mut filter = doc! { "username": username };
        if let Some(id) = puzzle_id {
            filter.insert("currentPuzzleId", id);
        }

        let res = self
            .docs()
            .update_one(
                filter,
                doc! { "$set": {
                    "currentPuzzleId": Bson::Null,
                    "currentPuzzleAnswers": Bson::Null,
                    "currentPuzzleWrongAttempts": 0i32,
                    "currentPuzzleElapsedTime": 0i64,
                    "currentPuzzleUpdatedAt": now_bson(),
                } },
            )
            .await
            .context("failed to clear current puzzle")?;

        Ok(res.matched_count == 1)
    }

    /// Record an exhausted puzzle in the failure ledger. The `$ne` filter
    /// keeps the set entry unique; the history append only happens on the
    /// first failure of that puzzle.
    pub async fn add_failed_puzzle(&self, username: &str, puzzle_id: &str) -> Result<bool> {
        let res = self
            .docs()
            .find_one_and_update(
                doc! { "username": username, "failedPuzzles": { "$ne": puzzle_id } },
                doc! {
                    "$addToSet": { "failedPuzzles": puzzle_id },
                    "$push": { "failedHistory": {
                        "puzzleId": puzzle_id,
                        "failedAt": now_bson(),
                    } },
                },
            )
            .return_document(ReturnDocument::After)
            .projection(doc! { "failedPuzzles": 1 })
            .await
            .context("failed to record failed puzzle")?;

        Ok(res.is_some())
    }

    /// Award one point for a puzzle, at most once per user and puzzleId.
    ///
    /// The whole award is a single conditional update: the filter excludes
    /// users that already completed this puzzle, and the update adds the
    /// set entry, bumps the score, and appends the history entry together.
    /// Two concurrent correct submissions therefore award exactly once —
    /// the loser of the race matches nothing and reads the score instead.
    pub async fn award_point_if_first(
        &self,
        username: &str,
        puzzle_id: &str,
        elapsed_time: i64,
    ) -> Result<AwardOutcome> {
        let res = self
            .docs()
            .find_one_and_update(
                doc! { "username": username, "completedPuzzles": { "$ne": puzzle_id } },
                doc! {
                    "$addToSet": { "completedPuzzles": puzzle_id },
                    "$inc": { "score": 1i64 },
                    "$push": { "completedHistory": {
                        "puzzleId": puzzle_id,
                        "completedAt": now_bson(),
                        "elapsedTime": elapsed_time,
                    } },
                },
            )
            .return_document(ReturnDocument::After)
            .projection(doc! { "score": 1 })
            .await
            .context("failed to award point")?;

        match res {
            Some(d) => Ok(AwardOutcome {
                updated: true,
                score: read_i64(&d, "score"),
            }),
            None => {
                let score = self
                    .get_user(username)
                    .await?
                    .map(|u| u.score)
                    .unwrap_or(0);
                Ok(AwardOutcome {
                    updated: false,
                    score,
                })
            }
        }
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let mut cursor = self
            .docs()
            .find(doc! {})
            .sort(doc! { "score": -1, "username": 1 })
            .limit(limit)
            .projection(doc! { "username": 1, "score": 1 })
            .await
            .context("failed to query leaderboard")?;

        let mut entries = Vec::new();
        while let Some(d) = cursor.try_next().await.context("leaderboard cursor failed")? {
            entries.push(LeaderboardEntry {
                username: d.get_str("username").unwrap_or_default().to_string(),
                score: read_i64(&d, "score"),
            });
        }
        Ok(entries)
    }
}

// MongoDB stores whichever integer width the writer used; accept both.
fn read_i64(d: &Document, key: &str) -> i64 {
    d.get_i64(key)
        .or_else(|_| d.get_i32(key).map(i64::from))
        .unwrap_or(0)
}

fn read_u32(d: &Document, key: &str) -> u32 {
    read_i64(d, key).max(0) as u32
}
