//! Application state owned by the portal controller, and the pure values
//! derived from it. Nothing here performs I/O.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::challenges::{ChallengeStatus, DailyChallenge};
use crate::models::events::{Event, EventRsvp};
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::levels::LevelTier;
use crate::models::points::PointsLedgerEntry;
use crate::models::preferences::Theme;
use crate::models::rewards::UserReward;
use crate::models::stores::{Product, Store};
use crate::models::students::Student;

pub mod levels;

use levels::LevelProgress;

/// Estimated kilograms of CO2 saved per lifetime point.
const CO2_KG_PER_POINT: f64 = 0.6;

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub current_user: Option<Student>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub history: Vec<PointsLedgerEntry>,
    pub daily_challenges: Vec<DailyChallenge>,
    pub events: Vec<Event>,
    pub event_rsvps: Vec<EventRsvp>,
    pub stores: Vec<Store>,
    pub products: Vec<Product>,
    pub user_rewards: Vec<UserReward>,
    pub levels: Vec<LevelTier>,
    pub theme: Theme,
}

/// Whether a stored check-in date belongs to an earlier day than `today`,
/// i.e. the daily check-in is available again.
pub fn is_stale(last_check_in: Option<NaiveDate>, today: NaiveDate) -> bool {
    last_check_in != Some(today)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImpactStats {
    pub co2_saved_kg: i64,
    pub items_recycled: usize,
    pub events_attended: usize,
}

/// A user reward joined with its product and store.
#[derive(Clone, Debug)]
pub struct RewardDetails<'a> {
    pub reward: &'a UserReward,
    pub product: &'a Product,
    pub store: &'a Store,
}

impl AppState {
    pub fn student_id(&self) -> Option<&str> {
        self.current_user
            .as_ref()
            .map(|user| user.student_id.as_str())
    }

    pub fn user_level(&self) -> LevelProgress {
        let points = self
            .current_user
            .as_ref()
            .map(|user| user.lifetime_points)
            .unwrap_or(0);
        levels::compute_level(points, &self.levels)
    }

    pub fn can_check_in(&self, today: NaiveDate) -> bool {
        self.current_user
            .as_ref()
            .map(|user| is_stale(user.last_check_in_date, today))
            .unwrap_or(false)
    }

    pub fn challenge(&self, challenge_id: &str) -> Option<&DailyChallenge> {
        self.daily_challenges
            .iter()
            .find(|daily| daily.challenge.id == challenge_id)
    }

    pub fn active_challenges(&self) -> impl Iterator<Item = &DailyChallenge> {
        self.daily_challenges
            .iter()
            .filter(|daily| daily.status == ChallengeStatus::Active)
    }

    pub fn has_rsvp(&self, event_id: &str) -> bool {
        self.event_rsvps.iter().any(|rsvp| rsvp.event_id == event_id)
    }

    pub fn next_event(&self, now: DateTime<Utc>) -> Option<&Event> {
        self.events.iter().find(|event| event.event_date > now)
    }

    pub fn store(&self, store_id: &str) -> Option<&Store> {
        self.stores.iter().find(|store| store.id == store_id)
    }

    /// The product only if it belongs to `store_id`.
    pub fn product(&self, store_id: &str, product_id: &str) -> Option<(&Store, &Product)> {
        let store = self.store(store_id)?;
        let product = self
            .products
            .iter()
            .find(|product| product.id == product_id && product.store_id == store_id)?;
        Some((store, product))
    }

    pub fn store_products(&self, store_id: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.store_id == store_id)
            .collect()
    }

    pub fn user_reward(&self, user_reward_id: &str) -> Option<&UserReward> {
        self.user_rewards
            .iter()
            .find(|reward| reward.id == user_reward_id)
    }

    pub fn reward_details<'a>(&'a self, reward: &'a UserReward) -> Option<RewardDetails<'a>> {
        let product = self
            .products
            .iter()
            .find(|product| product.id == reward.product_id)?;
        let store = self.store(&product.store_id)?;
        Some(RewardDetails {
            reward,
            product,
            store,
        })
    }

    pub fn impact_stats(&self) -> ImpactStats {
        let lifetime_points = self
            .current_user
            .as_ref()
            .map(|user| user.lifetime_points)
            .unwrap_or(0);
        let mentions = |word: &str| {
            self.history
                .iter()
                .filter(|entry| entry.description.to_lowercase().contains(word))
                .count()
        };

        ImpactStats {
            co2_saved_kg: (lifetime_points as f64 * CO2_KG_PER_POINT).round() as i64,
            items_recycled: mentions("submitted"),
            events_attended: mentions("attended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::points::PointsCategory;
    use crate::models::rewards::RewardStatus;
    use chrono::TimeZone;

    fn entry(description: &str) -> PointsLedgerEntry {
        PointsLedgerEntry {
            id: description.to_string(),
            student_id: "s1".to_string(),
            points_change: 10,
            description: description.to_string(),
            category: PointsCategory::Other,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
        }
    }

    fn product(id: &str, store_id: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "store_id": store_id,
            "name": format!("Product {}", id),
            "cost_in_points": 100,
        }))
        .unwrap()
    }

    #[test]
    fn staleness_is_a_date_comparison() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert!(is_stale(None, today));
        assert!(is_stale(today.pred_opt(), today));
        assert!(!is_stale(Some(today), today));
    }

    #[test]
    fn impact_counts_description_keywords() {
        let state = AppState {
            history: vec![
                entry("Submitted 4 bottles"),
                entry("submitted e-waste"),
                entry("Attended: Tree Plantation"),
                entry("Daily Check-in Bonus"),
            ],
            ..AppState::default()
        };

        let stats = state.impact_stats();
        assert_eq!(stats.items_recycled, 2);
        assert_eq!(stats.events_attended, 1);
        assert_eq!(stats.co2_saved_kg, 0);
    }

    #[test]
    fn product_lookup_requires_matching_store() {
        let state = AppState {
            stores: vec![
                serde_json::from_value(serde_json::json!({"id": "st1", "name": "Green Cafe"})).unwrap(),
            ],
            products: vec![product("p1", "st1"), product("p2", "st2")],
            ..AppState::default()
        };

        assert!(state.product("st1", "p1").is_some());
        assert!(state.product("st1", "p2").is_none());
        assert!(state.product("st2", "p2").is_none());
    }

    #[test]
    fn reward_details_need_product_and_store() {
        let reward = UserReward {
            id: "r1".to_string(),
            student_id: "s1".to_string(),
            product_id: "p1".to_string(),
            status: RewardStatus::Active,
            purchase_date: None,
            used_date: None,
        };
        let mut state = AppState {
            products: vec![product("p1", "st1")],
            ..AppState::default()
        };
        assert!(state.reward_details(&reward).is_none());

        state.stores = vec![
            serde_json::from_value(serde_json::json!({"id": "st1", "name": "Green Cafe"})).unwrap(),
        ];
        let details = state.reward_details(&reward).unwrap();
        assert_eq!(details.store.name, "Green Cafe");
    }
}
