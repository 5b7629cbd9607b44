use serde::{Deserialize, Serialize};

/// Row returned by the `get_leaderboard` RPC, already ranked.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub lifetime_points: i64,
}
