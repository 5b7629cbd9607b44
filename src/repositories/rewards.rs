use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::backend::{insert_as, select_as, Backend, Query};
use crate::models::rewards::{NewUserReward, RewardStatus, RewardUsage, UserReward};

#[derive(Clone)]
pub struct RewardRepository {
    backend: Arc<dyn Backend>,
}

impl RewardRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The student's redeemed rewards, most recent purchase first.
    pub async fn user_rewards(&self, student_id: &str) -> Result<Vec<UserReward>, anyhow::Error> {
        select_as(
            self.backend.as_ref(),
            "user_rewards",
            &Query::new()
                .eq("student_id", student_id)
                .order("purchase_date", false),
        )
        .await
    }

    pub async fn create(
        &self,
        student_id: &str,
        product_id: &str,
    ) -> Result<UserReward, anyhow::Error> {
        let reward = NewUserReward {
            student_id: student_id.to_string(),
            product_id: product_id.to_string(),
            status: RewardStatus::Active,
        };

        insert_as(self.backend.as_ref(), "user_rewards", &reward).await
    }

    pub async fn mark_used(
        &self,
        user_reward_id: &str,
        used_date: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        let usage = RewardUsage {
            status: RewardStatus::Used,
            used_date,
        };

        self.backend
            .update(
                "user_rewards",
                &Query::new().eq("id", user_reward_id),
                serde_json::to_value(usage)?,
            )
            .await
    }
}
