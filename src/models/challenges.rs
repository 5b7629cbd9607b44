use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{nullable, row_id};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Challenge {
    #[serde(with = "row_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: String,
    pub points_reward: i64,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeStatus {
    Active,
    Completed,
}

/// A challenge together with the current student's completion status for today.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyChallenge {
    pub challenge: Challenge,
    pub status: ChallengeStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCompletion {
    #[serde(with = "row_id")]
    pub challenge_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewChallengeCompletion {
    pub challenge_id: String,
    pub student_id: String,
    pub completed_at: NaiveDate,
}
