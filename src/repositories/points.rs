use std::sync::Arc;

use super::backend::{select_as, Backend, Query};
use crate::models::points::{NewLedgerEntry, PointsLedgerEntry};

#[derive(Clone)]
pub struct PointsRepository {
    backend: Arc<dyn Backend>,
}

impl PointsRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The student's ledger, newest entry first.
    pub async fn history(&self, student_id: &str) -> Result<Vec<PointsLedgerEntry>, anyhow::Error> {
        select_as(
            self.backend.as_ref(),
            "points_history",
            &Query::new()
                .eq("student_id", student_id)
                .order("created_at", false),
        )
        .await
    }

    pub async fn record(&self, entry: &NewLedgerEntry) -> Result<(), anyhow::Error> {
        self.backend
            .insert("points_history", serde_json::to_value(entry)?)
            .await
    }
}
