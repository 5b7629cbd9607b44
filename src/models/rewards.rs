use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::row_id;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Active,
    Used,
}

/// A redeemed product. Moves from `Active` to `Used` exactly once.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UserReward {
    #[serde(with = "row_id")]
    pub id: String,
    pub student_id: String,
    #[serde(with = "row_id")]
    pub product_id: String,
    pub status: RewardStatus,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_date: Option<DateTime<Utc>>,
}

impl UserReward {
    pub fn is_active(&self) -> bool {
        self.status == RewardStatus::Active
    }

    pub fn mark_used(&mut self, used_date: DateTime<Utc>) {
        self.status = RewardStatus::Used;
        self.used_date = Some(used_date);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NewUserReward {
    pub student_id: String,
    pub product_id: String,
    pub status: RewardStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct RewardUsage {
    pub status: RewardStatus,
    pub used_date: DateTime<Utc>,
}
