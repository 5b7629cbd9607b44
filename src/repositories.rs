use std::sync::Arc;

pub mod activity;
pub mod auth;
pub mod backend;
pub mod challenges;
pub mod events;
pub mod levels;
pub mod media;
pub mod memory;
pub mod points;
pub mod preferences;
pub mod rewards;
pub mod stores;
pub mod students;
pub mod supabase;

use backend::Backend;

/// Typed access to every table the portal reads or writes, all sharing one backend.
#[derive(Clone)]
pub struct Repositories {
    pub students: students::StudentRepository,
    pub points: points::PointsRepository,
    pub challenges: challenges::ChallengeRepository,
    pub events: events::EventRepository,
    pub stores: stores::StoreRepository,
    pub rewards: rewards::RewardRepository,
    pub levels: levels::LevelRepository,
    pub activity: activity::ActivityRepository,
}

impl Repositories {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            students: students::StudentRepository::new(backend.clone()),
            points: points::PointsRepository::new(backend.clone()),
            challenges: challenges::ChallengeRepository::new(backend.clone()),
            events: events::EventRepository::new(backend.clone()),
            stores: stores::StoreRepository::new(backend.clone()),
            rewards: rewards::RewardRepository::new(backend.clone()),
            levels: levels::LevelRepository::new(backend.clone()),
            activity: activity::ActivityRepository::new(backend),
        }
    }
}
