use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Ceiling on wrong submissions per puzzle: the original wrong guess plus
/// three further attempts.
pub const MAX_WRONG_ATTEMPTS: u32 = 4;

/// User document stored in the MongoDB "users" collection, keyed by
/// username. Carries the permanent score ledger and the single-slot
/// current-puzzle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,

    // Score ledger
    #[serde(default)]
    pub score: i64,
    #[serde(rename = "completedPuzzles", default)]
    pub completed_puzzles: Vec<String>,
    #[serde(rename = "completedHistory", default)]
    pub completed_history: Vec<CompletedEntry>,
    #[serde(rename = "failedPuzzles", default)]
    pub failed_puzzles: Vec<String>,
    #[serde(rename = "failedHistory", default)]
    pub failed_history: Vec<FailedEntry>,

    // Current-puzzle slot; read through `current_puzzle()`
    #[serde(rename = "currentPuzzleId", default)]
    pub current_puzzle_id: Option<String>,
    #[serde(rename = "currentPuzzleAnswers", default)]
    pub current_puzzle_answers: Option<String>,
    #[serde(rename = "currentPuzzleWrongAttempts", default)]
    pub current_puzzle_wrong_attempts: u32,
    #[serde(rename = "currentPuzzleElapsedTime", default)]
    pub current_puzzle_elapsed_time: i64,
    #[serde(
        rename = "currentPuzzleUpdatedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub current_puzzle_updated_at: Option<DateTime<Utc>>,
}

/// The lifecycle state machine's view of the current-puzzle slot: either no
/// assignment, or exactly one assigned puzzle with its working state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentPuzzle {
    None,
    Assigned {
        puzzle_id: String,
        answers: Option<String>,
        wrong_attempts: u32,
        elapsed_time: i64,
    },
}

impl UserDoc {
    pub fn current_puzzle(&self) -> CurrentPuzzle {
        match &self.current_puzzle_id {
            None => CurrentPuzzle::None,
            Some(puzzle_id) => CurrentPuzzle::Assigned {
                puzzle_id: puzzle_id.clone(),
                answers: self.current_puzzle_answers.clone(),
                wrong_attempts: self.current_puzzle_wrong_attempts,
                elapsed_time: self.current_puzzle_elapsed_time,
            },
        }
    }

    pub fn remaining_attempts(&self) -> u32 {
        MAX_WRONG_ATTEMPTS.saturating_sub(self.current_puzzle_wrong_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedEntry {
    #[serde(rename = "puzzleId")]
    pub puzzle_id: String,
    #[serde(rename = "completedAt", with = "bson_datetime_as_chrono")]
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "elapsedTime", default)]
    pub elapsed_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    #[serde(rename = "puzzleId")]
    pub puzzle_id: String,
    #[serde(rename = "failedAt", with = "bson_datetime_as_chrono")]
    pub failed_at: DateTime<Utc>,
}

// Serde converters for chrono::DateTime <-> mongodb::bson::DateTime
pub(crate) mod bson_datetime_as_chrono {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        bson::DateTime::from_millis(date.timestamp_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bson_dt = bson::DateTime::deserialize(deserializer)?;
        DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

pub(crate) mod bson_datetime_as_chrono_option {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_some(&bson::DateTime::from_millis(d.timestamp_millis())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.and_then(|dt| DateTime::from_timestamp_millis(dt.timestamp_millis())))
    }
}

/// Ledger view returned to the client (RFC 3339 timestamps, not BSON).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub username: String,
    pub score: i64,
    pub completed_puzzles: Vec<String>,
    pub completed_history: Vec<CompletedEntryView>,
    pub failed_puzzles: Vec<String>,
    pub failed_history: Vec<FailedEntryView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedEntryView {
    pub puzzle_id: String,
    pub completed_at: DateTime<Utc>,
    pub elapsed_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEntryView {
    pub puzzle_id: String,
    pub failed_at: DateTime<Utc>,
}

impl From<UserDoc> for ScoreSummary {
    fn from(user: UserDoc) -> Self {
        ScoreSummary {
            username: user.username,
            score: user.score,
            completed_puzzles: user.completed_puzzles,
            completed_history: user
                .completed_history
                .into_iter()
                .map(|e| CompletedEntryView {
                    puzzle_id: e.puzzle_id,
                    completed_at: e.completed_at,
                    elapsed_time: e.elapsed_time,
                })
                .collect(),
            failed_puzzles: user.failed_puzzles,
            failed_history: user
                .failed_history
                .into_iter()
                .map(|e| FailedEntryView {
                    puzzle_id: e.puzzle_id,
                    failed_at: e.failed_at,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
}
