use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::nullable;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Student {
    pub student_id: String,
    #[serde(default)]
    pub auth_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub is_green_club_member: bool,
    pub current_points: i64,
    pub lifetime_points: i64,
    #[serde(default)]
    pub last_check_in_date: Option<NaiveDate>,
}

impl Student {
    /// Points earned raise both balances so `current_points <= lifetime_points` holds.
    pub fn earn(&mut self, points: i64) {
        self.current_points += points;
        self.lifetime_points += points;
    }

    /// Spending never touches the lifetime total.
    pub fn spend(&mut self, points: i64) {
        self.current_points -= points;
    }

    pub fn record_check_in(&mut self, today: NaiveDate, reward: i64) {
        self.last_check_in_date = Some(today);
        self.earn(reward);
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.current_points >= cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        serde_json::from_value(serde_json::json!({
            "student_id": "21BCS001",
            "name": "Asha",
            "current_points": 40,
            "lifetime_points": 90,
        }))
        .expect("minimal student row")
    }

    #[test]
    fn optional_columns_default_when_missing() {
        let student = student();
        assert_eq!(student.last_check_in_date, None);
        assert!(!student.is_green_club_member);
        assert_eq!(student.avatar_url, None);
    }

    #[test]
    fn check_in_raises_both_balances() {
        let mut student = student();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        student.record_check_in(today, 10);

        assert_eq!(student.last_check_in_date, Some(today));
        assert_eq!(student.current_points, 50);
        assert_eq!(student.lifetime_points, 100);
    }

    #[test]
    fn spending_keeps_lifetime_total() {
        let mut student = student();
        student.spend(40);
        assert_eq!(student.current_points, 0);
        assert_eq!(student.lifetime_points, 90);
        assert!(student.can_afford(0));
        assert!(!student.can_afford(1));
    }
}
