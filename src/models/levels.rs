use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LevelTier {
    pub level_number: u32,
    pub min_points: i64,
    pub title: String,
}

impl LevelTier {
    pub fn new(level_number: u32, min_points: i64, title: &str) -> Self {
        Self {
            level_number,
            min_points,
            title: title.to_string(),
        }
    }
}
