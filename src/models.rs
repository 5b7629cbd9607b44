pub mod activity;
pub mod challenges;
pub mod events;
pub mod leaderboard;
pub mod levels;
pub mod nullable;
pub mod points;
pub mod preferences;
pub mod rewards;
pub mod row_id;
pub mod stores;
pub mod students;
