use std::sync::Arc;

use chrono::NaiveDate;

use super::backend::{select_as, Backend, Query};
use crate::models::challenges::{Challenge, ChallengeCompletion, NewChallengeCompletion};

#[derive(Clone)]
pub struct ChallengeRepository {
    backend: Arc<dyn Backend>,
}

impl ChallengeRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn challenges(&self) -> Result<Vec<Challenge>, anyhow::Error> {
        select_as(self.backend.as_ref(), "challenges", &Query::new()).await
    }

    /// Ids of the challenges `student_id` completed on `date`.
    pub async fn completed_on(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, anyhow::Error> {
        let completions: Vec<ChallengeCompletion> = select_as(
            self.backend.as_ref(),
            "challenge_completions",
            &Query::new()
                .eq("student_id", student_id)
                .eq("completed_at", date.to_string()),
        )
        .await?;

        Ok(completions
            .into_iter()
            .map(|completion| completion.challenge_id)
            .collect())
    }

    pub async fn record_completion(
        &self,
        completion: &NewChallengeCompletion,
    ) -> Result<(), anyhow::Error> {
        self.backend
            .insert("challenge_completions", serde_json::to_value(completion)?)
            .await
    }
}
