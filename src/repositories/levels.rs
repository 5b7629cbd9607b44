use std::sync::Arc;

use serde_json::json;

use super::backend::{select_as, Backend, Query};
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::levels::LevelTier;

#[derive(Clone)]
pub struct LevelRepository {
    backend: Arc<dyn Backend>,
}

impl LevelRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn levels(&self) -> Result<Vec<LevelTier>, anyhow::Error> {
        select_as(
            self.backend.as_ref(),
            "levels",
            &Query::new().order("level_number", true),
        )
        .await
    }

    /// Precomputed ranking by lifetime points.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, anyhow::Error> {
        let ranked = self.backend.rpc("get_leaderboard", json!({})).await?;
        Ok(serde_json::from_value(ranked)?)
    }
}
