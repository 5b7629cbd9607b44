use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, row_id};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PointsCategory {
    CheckIn,
    Challenge,
    Event,
    RewardPurchase,
    #[serde(other)]
    Other,
}

/// One row of the append-only `points_history` table.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PointsLedgerEntry {
    #[serde(with = "row_id")]
    pub id: String,
    pub student_id: String,
    pub points_change: i64,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: String,
    #[serde(rename = "type")]
    pub category: PointsCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NewLedgerEntry {
    pub student_id: String,
    pub points_change: i64,
    pub description: String,
    #[serde(rename = "type")]
    pub category: PointsCategory,
}

impl NewLedgerEntry {
    pub fn check_in(student_id: &str, reward: i64) -> Self {
        Self {
            student_id: student_id.to_string(),
            points_change: reward,
            description: "Daily Check-in Bonus".to_string(),
            category: PointsCategory::CheckIn,
        }
    }

    pub fn challenge(student_id: &str, title: &str, reward: i64) -> Self {
        Self {
            student_id: student_id.to_string(),
            points_change: reward,
            description: format!("Completed: {}", title),
            category: PointsCategory::Challenge,
        }
    }

    pub fn purchase(student_id: &str, product_name: &str, cost: i64) -> Self {
        Self {
            student_id: student_id.to_string(),
            points_change: -cost,
            description: format!("Purchased: {}", product_name),
            category: PointsCategory::RewardPurchase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_categories_are_kept_as_other() {
        let entry: PointsLedgerEntry = serde_json::from_value(serde_json::json!({
            "id": 7,
            "student_id": "21BCS001",
            "points_change": 25,
            "description": "Submitted 3 bottles",
            "type": "recycling",
            "created_at": "2026-10-01T09:30:00+00:00",
        }))
        .expect("ledger row");

        assert_eq!(entry.id, "7");
        assert_eq!(entry.category, PointsCategory::Other);
    }

    #[test]
    fn purchase_entry_is_a_debit() {
        let entry = NewLedgerEntry::purchase("21BCS001", "Bamboo Bottle", 300);
        let row = serde_json::to_value(&entry).unwrap();

        assert_eq!(row["points_change"], -300);
        assert_eq!(row["type"], "reward-purchase");
        assert_eq!(row["description"], "Purchased: Bamboo Bottle");
    }
}
